//! Static report template. Values are escaped so their literal text is what
//! ends up on the page.

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
  body { font-family: -apple-system, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; color: #1f2937; margin: 0; }
  header { background: #0f172a; color: #f8fafc; padding: 24px 32px; border-radius: 8px; }
  header h1 { margin: 0 0 8px 0; font-size: 24px; }
  header p { margin: 2px 0; font-size: 12px; color: #cbd5e1; }
  section { margin-top: 24px; }
  h2 { font-size: 18px; border-bottom: 2px solid #3b82f6; padding-bottom: 4px; }
  pre { background: #f1f5f9; border: 1px solid #e2e8f0; border-radius: 6px; padding: 12px;
        font-size: 11px; white-space: pre-wrap; word-break: break-all; }
  .summary { white-space: pre-wrap; font-size: 13px; line-height: 1.5; }
  footer { margin-top: 32px; font-size: 10px; color: #64748b; text-align: center; }
"#;

pub fn build_report_html(target: &str, scan_output: &str, ai_summary: &str, generated_at: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Nmap Security Report - {target}</title>
<style>{STYLE}</style>
</head>
<body>
<header>
  <h1>Network Security Scan Report</h1>
  <p>Target: {target}</p>
  <p>Generated: {generated_at}</p>
</header>
<section>
  <h2>AI Security Analysis</h2>
  <div class="summary">{summary}</div>
</section>
<section>
  <h2>Raw Scan Output</h2>
  <pre>{scan}</pre>
</section>
<footer>Only scan systems you own or are authorized to test.</footer>
</body>
</html>
"#,
        target = escape(target),
        generated_at = escape(generated_at),
        summary = escape(ai_summary),
        scan = escape(scan_output),
    )
}

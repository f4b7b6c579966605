//! Static HTML galleries.
//!
//! Each run gets `run_<n>/index.html` with one card per image; the session
//! gets an `index.html` listing its runs newest first. Pages are rebuilt
//! from the run records after every image. While a run is in progress its
//! pages reload themselves every few seconds; finished pages stay still.
//! Clicking a run image opens it full screen.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::models::{RunRecord, RunStatus};
use crate::persist;
use crate::session::Session;

const INDEX_FILE: &str = "index.html";

const STYLE: &str = r"
    body { font-family: -apple-system, Helvetica, Arial, sans-serif; margin: 24px; color: #222; }
    h1 { margin-top: 0; }
    .grid { display: flex; flex-wrap: wrap; gap: 16px; }
    .card { border: 1px solid #ddd; border-radius: 6px; padding: 12px; max-width: 540px; }
    .card img { max-width: 100%; border-radius: 4px; }
    .meta { font-family: monospace; background: #f5f5f5; padding: 8px; border-radius: 4px; white-space: pre-wrap; }
    .command { font-family: monospace; background: #eef; padding: 8px; border-radius: 4px; overflow-x: auto; }
    .status { padding: 2px 8px; border-radius: 3px; font-size: 0.85em; margin-left: 8px; }
    .completed { background: #d4edda; color: #155724; }
    .in_progress { background: #fff3cd; color: #856404; }
    .pending { background: #e2e3e5; color: #383d41; }
    .run { border: 1px solid #ddd; border-radius: 6px; padding: 12px; margin-bottom: 16px; }
    .thumbs { display: flex; flex-wrap: wrap; gap: 8px; margin-top: 8px; }
    .thumbs img { width: 160px; border-radius: 3px; }
    .muted { color: #666; font-size: 0.9em; }
    .zoom { cursor: zoom-in; }
    #viewer { display: none; position: fixed; inset: 0; background: rgba(0, 0, 0, 0.9); z-index: 1000; cursor: zoom-out; }
    #viewer.open { display: flex; align-items: center; justify-content: center; }
    #viewer img { max-width: 95vw; max-height: 95vh; object-fit: contain; }
";

/// Full-screen image view; click or Escape closes it.
const VIEWER: &str = r#"<div id="viewer"><img alt=""></div>
<script>
  const viewer = document.getElementById('viewer');
  const close = () => viewer.classList.remove('open');
  document.querySelectorAll('img.zoom').forEach((img) => {
    img.addEventListener('click', (event) => {
      event.preventDefault();
      viewer.querySelector('img').src = img.src;
      viewer.classList.add('open');
    });
  });
  viewer.addEventListener('click', close);
  document.addEventListener('keydown', (event) => {
    if (event.key === 'Escape') close();
  });
</script>
"#;

/// Seconds between reloads of a page showing an unfinished run.
const RELOAD_SECONDS: u32 = 5;

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn status_badge(record: &RunRecord) -> String {
    let done = record.results.len();
    let total = record.variation_count;
    let label = match record.status {
        RunStatus::Completed => format!("Complete ({done}/{total})"),
        RunStatus::InProgress => format!("Generating ({done}/{total})"),
        RunStatus::Pending => format!("Pending ({done}/{total})"),
    };
    format!(
        r#"<span class="status {}">{}</span>"#,
        record.status.as_str(),
        escape(&label)
    )
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,/:=".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Command line that regenerates one image of `record`.
pub fn reproduce_command(record: &RunRecord, seed: u64, steps: u32) -> String {
    let mut parts = vec![
        "fluxdeck".to_string(),
        "--prompt".to_string(),
        shell_quote(record.inheritable_prompt()),
        "--model".to_string(),
        record.model.as_str().to_string(),
        "--resolution".to_string(),
        record.resolution.to_string(),
    ];
    if let Some(style) = &record.style_name {
        parts.push("--style".to_string());
        parts.push(shell_quote(style));
    }
    parts.extend([
        "--seed".to_string(),
        seed.to_string(),
        "--steps".to_string(),
        steps.to_string(),
        "--variations".to_string(),
        "1".to_string(),
    ]);
    if record.metadata {
        parts.push("--metadata".to_string());
    }
    parts.join(" ")
}

fn page(title: &str, body: &str, live: bool) -> String {
    let reload = if live {
        format!("<meta http-equiv=\"refresh\" content=\"{RELOAD_SECONDS}\">\n")
    } else {
        String::new()
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n{reload}\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}{VIEWER}</body>\n</html>\n",
        escape(title)
    )
}

/// Render the page for a single run.
pub fn render_run_page(id: u32, record: &RunRecord) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>Run {id} {}</h1>", status_badge(record));
    let _ = writeln!(body, "<p><strong>Prompt:</strong> {}</p>", escape(&record.prompt));
    let _ = writeln!(
        body,
        "<p><strong>Model:</strong> {} &middot; <strong>Steps:</strong> {} &middot; <strong>Resolution:</strong> {}</p>",
        escape(record.model.as_str()),
        escape(&record.steps.to_string()),
        escape(&record.resolution.to_string())
    );
    if let Some(style) = &record.style_name {
        let _ = writeln!(body, "<p><strong>Style:</strong> {}</p>", escape(style));
    }
    let _ = writeln!(
        body,
        "<p class=\"muted\">Started {}</p>",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    body.push_str("<div class=\"grid\">\n");
    for image in &record.results {
        let file = escape(&image.file);
        let _ = writeln!(
            body,
            "<div class=\"card\">\n<h3>Image {} (seed {})</h3>\n<a href=\"{file}\"><img class=\"zoom\" src=\"{file}\" alt=\"image {}\" loading=\"lazy\"></a>\n<div class=\"meta\">Seed: {}\nSteps: {}\nTime: {:.2}s</div>\n<div class=\"command\">{}</div>\n</div>",
            image.index,
            image.seed,
            image.index,
            image.seed,
            image.steps,
            image.generation_time,
            escape(&reproduce_command(record, image.seed, image.steps))
        );
    }
    body.push_str("</div>\n<p><a href=\"../index.html\">All runs</a></p>\n");

    let live = record.status == RunStatus::InProgress;
    page(&format!("Run {id}"), &body, live)
}

/// Render the session overview from `(id, record)` pairs in any order.
pub fn render_session_page(name: &str, runs: &[(u32, RunRecord)]) -> String {
    let mut ordered: Vec<&(u32, RunRecord)> = runs.iter().collect();
    ordered.sort_by(|a, b| b.0.cmp(&a.0));

    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", escape(name));
    if ordered.is_empty() {
        body.push_str("<p class=\"muted\">No runs yet.</p>\n");
    }

    for (id, record) in &ordered {
        let _ = writeln!(
            body,
            "<div class=\"run\">\n<h2><a href=\"run_{id}/index.html\">Run {id}</a>{}</h2>",
            status_badge(record)
        );
        let _ = writeln!(body, "<p>{}</p>", escape(&record.prompt));
        let _ = writeln!(
            body,
            "<p class=\"muted\">{} &middot; steps {} &middot; {} &middot; {:.2}s total</p>",
            escape(record.model.as_str()),
            escape(&record.steps.to_string()),
            escape(&record.resolution.to_string()),
            record.total_generation_time()
        );
        body.push_str("<div class=\"thumbs\">");
        for image in &record.results {
            let _ = write!(
                body,
                "<a href=\"run_{id}/index.html\"><img src=\"run_{id}/{}\" alt=\"seed {}\" loading=\"lazy\"></a>",
                escape(&image.file),
                image.seed
            );
        }
        body.push_str("</div>\n</div>\n");
    }

    let live = ordered
        .iter()
        .any(|(_, record)| record.status == RunStatus::InProgress);
    page(name, &body, live)
}

/// Write `index.html` into a run directory.
pub fn render_run(run_dir: &Path, id: u32, record: &RunRecord) -> Result<PathBuf> {
    let path = run_dir.join(INDEX_FILE);
    persist::write_atomic(&path, render_run_page(id, record).as_bytes())?;
    Ok(path)
}

/// Write the session `index.html` from the records on disk.
pub fn render_session(session: &Session) -> Result<PathBuf> {
    let path = session.root().join(INDEX_FILE);
    let html = render_session_page(&session.name(), &session.records());
    persist::write_atomic(&path, html.as_bytes())?;
    Ok(path)
}

/// Re-render every run page and the session page.
pub fn render_all(session: &Session) -> Result<PathBuf> {
    for (id, record) in session.records() {
        render_run(&session.run_dir(id), id, &record)?;
    }
    render_session(session)
}

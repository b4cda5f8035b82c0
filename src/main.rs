//! pageflow – command-line pagination and PDF export.
//!
//! Usage:
//!   pageflow <input.html|input.json> [output.pdf] [--no-page-numbers]
//!            [--quality N] [--title T] [--font PATH] [--no-system-fonts]
//!            [--breaks] [--preview FILE]
//!   pageflow --sample NAME [output.pdf] ...
//!
//! If `output.pdf` is omitted the PDF is written next to the input file with
//! the same stem (e.g. `notes.html` → `notes.pdf`).

use std::{env, fs, path::PathBuf, process};

use pageflow::export::{export_to_pdf, load_document, ContentSource, ExportOptions};
use pageflow::presenter::{present, render_preview};
use pageflow::samples::{sample, SAMPLE_NAMES};
use pageflow::{compute_breaks, Document, PageMetrics};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut sample_name: Option<String> = None;
    let mut preview_path: Option<PathBuf> = None;
    let mut print_breaks = false;
    let mut options = ExportOptions::default();
    let mut title: Option<String> = None;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-page-numbers" => options.include_page_numbers = false,
            "--no-system-fonts" => options.system_fonts = false,
            "--breaks" => print_breaks = true,
            "--quality" | "-q" => {
                let value = flag_value(&mut iter, arg, &args[0]);
                options.quality = match value.parse() {
                    Ok(q) => q,
                    Err(_) => {
                        eprintln!("Invalid quality: {value}");
                        process::exit(1);
                    }
                };
            }
            "--title" | "-t" => title = Some(flag_value(&mut iter, arg, &args[0])),
            "--font" => options.font_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--preview" => preview_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--sample" => sample_name = Some(flag_value(&mut iter, arg, &args[0])),
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                // With --sample the only positional is the output.
                let slot = positional + usize::from(sample_name.is_some());
                match slot {
                    0 => input_path = Some(PathBuf::from(path)),
                    1 => output_path = Some(PathBuf::from(path)),
                    _ => {
                        eprintln!("Unexpected argument: {path}");
                        print_usage(&args[0]);
                        process::exit(1);
                    }
                }
                positional += 1;
            }
        }
    }

    let (source, document, stem) = match (&sample_name, &input_path) {
        (Some(name), _) => match sample(name) {
            Some(html) => {
                let document = Document::from_html(&html);
                (ContentSource::Html(html), document, name.clone())
            }
            None => {
                eprintln!("Unknown sample '{name}'. Available: {}", SAMPLE_NAMES.join(", "));
                process::exit(1);
            }
        },
        (None, Some(input)) => {
            let document = match load_document(input) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("Error reading '{}': {e}", input.display());
                    process::exit(1);
                }
            };
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document")
                .to_string();
            (ContentSource::Path(input.clone()), document, stem)
        }
        (None, None) => {
            eprintln!("Error: no input file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let metrics = PageMetrics::a4();
    let result = compute_breaks(document.blocks(), metrics.content_height());

    if print_breaks {
        println!("{}", result.to_json());
    }

    if let Some(path) = &preview_path {
        let markers = present(&result.breaks, result.page_count, &metrics);
        let html = render_preview(&document, &markers, result.page_count);
        if let Err(e) = fs::write(path, html) {
            eprintln!("Error writing '{}': {e}", path.display());
            process::exit(1);
        }
        eprintln!("Wrote preview '{}'", path.display());
    }

    // --breaks / --preview alone do not export.
    if (print_breaks || preview_path.is_some()) && output_path.is_none() {
        return;
    }

    options.filename = output_path.unwrap_or_else(|| match &input_path {
        Some(input) if sample_name.is_none() => input.with_extension("pdf"),
        _ => PathBuf::from(format!("{stem}.pdf")),
    });
    options.title = title.unwrap_or(stem);

    match export_to_pdf(&source, &options) {
        Ok(report) => {
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{})",
                report.path.display(),
                report.bytes,
                report.pages_written,
                if report.pages_written == 1 { "" } else { "s" }
            );
            if !report.failed_pages.is_empty() {
                eprintln!("Warning: pages {:?} could not be rendered", report.failed_pages);
            }
        }
        Err(e) => {
            eprintln!("Error exporting PDF: {e}");
            process::exit(1);
        }
    }
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str, prog: &str) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("pageflow – A4 pagination and PDF export");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <input.html|input.json> [output.pdf] [flags]");
    eprintln!("  {prog} --sample NAME [output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <input>            Editor HTML or JSON document");
    eprintln!("  [output.pdf]       Output path (default: same stem as input with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --no-page-numbers  Do not stamp \"Page X of Y\" footers");
    eprintln!("  --quality, -q N    Raster scale 1-4 (default 2; clamped)");
    eprintln!("  --title, -t T      Document title in PDF metadata (default: input stem)");
    eprintln!("  --font PATH        TTF/OTF font for all text");
    eprintln!("  --no-system-fonts  Skip system font lookup");
    eprintln!("  --breaks           Print the page breaks as JSON");
    eprintln!("  --preview FILE     Write HTML with page markers to FILE");
    eprintln!("  --sample NAME      Use a built-in sample ({})", SAMPLE_NAMES.join(", "));
    eprintln!("  --help             Print this message");
}

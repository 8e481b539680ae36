use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Splice numbered sections from rendered DOCX files into a master template.
#[derive(Parser)]
#[command(name = "docsplice", version, about)]
struct Args {
    /// Directory of rendered source documents (*.docx)
    #[arg(short, long, value_name = "DIR")]
    input_dir: PathBuf,

    /// Master template containing {{SECTION_<n>}} placeholders
    #[arg(short, long, value_name = "FILE")]
    template: PathBuf,

    /// Directory for merged output documents
    #[arg(short, long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Directory of fallback icon assets (GHS<n>.png/jpg/jpeg)
    #[arg(long, value_name = "DIR", default_value = "icons")]
    icons_dir: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !args.template.is_file() {
        // Per-batch policy: without a template there is nothing to merge
        // into, but this is a skip, not a crash.
        log::warn!(
            "template not found at {}, skipping merge",
            args.template.display()
        );
        return ExitCode::SUCCESS;
    }

    let mut inputs: Vec<PathBuf> = match std::fs::read_dir(&args.input_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
            })
            .collect(),
        Err(e) => {
            log::error!("cannot read input dir {}: {}", args.input_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };
    inputs.sort();

    if inputs.is_empty() {
        log::warn!("no .docx files in {}", args.input_dir.display());
        return ExitCode::SUCCESS;
    }

    let mut failures = 0usize;
    for input in &inputs {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".into());
        let output = args.output_dir.join(format!("{stem}_merged.docx"));

        log::info!("processing {}", input.display());
        match docsplice::merge_docx(input, &args.template, &args.icons_dir, &output) {
            Ok(()) => log::info!("wrote {}", output.display()),
            Err(e) => {
                // One bad document never aborts the rest of the batch.
                log::error!("failed to merge {}: {}", input.display(), e);
                failures += 1;
            }
        }
    }

    if failures == inputs.len() {
        log::error!("all {} documents failed", failures);
        return ExitCode::FAILURE;
    }
    if failures > 0 {
        log::warn!("{} of {} documents failed", failures, inputs.len());
    }
    ExitCode::SUCCESS
}

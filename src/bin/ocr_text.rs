use anyhow::Context;
use clap::Parser;
use conciliador::config::toml_config::OcrConfig;
use conciliador::utils::logger;
use conciliador::OcrMyPdfTextSource;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ocr_text")]
#[command(about = "OCR a single PDF and save the searchable PDF plus its text")]
struct Args {
    /// PDF to process
    #[arg(short, long)]
    input: PathBuf,

    /// Folder for `<name>_OCR.pdf` and `<name>_OCR.txt`
    #[arg(short, long, default_value = "output")]
    outdir: PathBuf,

    /// Tesseract languages (e.g. spa, spa+eng)
    #[arg(short, long, default_value = "spa+eng")]
    lang: String,

    /// OCR every page even if it already has text
    #[arg(long)]
    force: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose, None);

    if !args.input.is_file() {
        eprintln!("❌ No existe el archivo: {}", args.input.display());
        std::process::exit(1);
    }

    tokio::fs::create_dir_all(&args.outdir)
        .await
        .with_context(|| format!("cannot create {}", args.outdir.display()))?;

    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "documento".to_string());
    let pdf_out = args.outdir.join(format!("{}_OCR.pdf", stem));
    let txt_out = args.outdir.join(format!("{}_OCR.txt", stem));

    let source = OcrMyPdfTextSource::new(OcrConfig {
        languages: args.lang,
        force_ocr: args.force,
        ..OcrConfig::default()
    });

    tracing::info!("🔍 OCR {} → {}", args.input.display(), pdf_out.display());
    match source.ocr_into(&args.input, &pdf_out).await {
        Ok(text) => {
            tokio::fs::write(&txt_out, text)
                .await
                .with_context(|| format!("cannot write {}", txt_out.display()))?;
            println!("✅ PDF: {}", pdf_out.display());
            println!("✅ Texto: {}", txt_out.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ OCR failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }
}

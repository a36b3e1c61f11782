use clap::{Parser, Subcommand};
use legaldoc::config::EditorConfig;
use legaldoc::editor::EditorSession;
use legaldoc::host::{Host, Severity};
use legaldoc::pipeline::{Artifact, ExportFormat, LoadState, SourceDocument};
use legaldoc::richtext::markup::visible_text;
use legaldoc::templates::TemplateLibrary;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "legaldoc")]
#[command(about = "Open, convert and export legal document templates", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Template directory (overrides the config file)
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the editor markup of a document
    Render {
        /// Document path or template name
        input: String,
    },
    /// Print the visible text of a document
    Text {
        /// Document path or template name
        input: String,
    },
    /// Import a document and export it again
    Export {
        /// Document path or template name
        input: String,
        /// docx or html (defaults to the configured format)
        #[arg(short, long)]
        format: Option<ExportFormat>,
        /// Document title, used for the file name
        #[arg(short, long)]
        title: Option<String>,
        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a printable HTML page
    Print {
        /// Document path or template name
        input: String,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available templates
    Templates,
}

/// Host for a one-shot command line run
#[derive(Default)]
struct CliHost {
    downloads: Vec<Artifact>,
    print_view: Option<String>,
}

impl Host for CliHost {
    fn on_title_change(&mut self, title: &str) {
        tracing::debug!(title, "title changed");
    }

    fn on_close(&mut self) {}

    fn notify(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Success | Severity::Info => eprintln!("{message}"),
            Severity::Warning => eprintln!("Warning: {message}"),
            Severity::Error => eprintln!("Error: {message}"),
        }
    }

    fn offer_download(&mut self, artifact: Artifact) {
        self.downloads.push(artifact);
    }

    fn open_print_view(&mut self, html: &str) {
        self.print_view = Some(html.to_string());
    }
}

fn open_source(input: &str, library: &TemplateLibrary) -> Result<SourceDocument, String> {
    let path = Path::new(input);
    if path.is_file() {
        return match SourceDocument::from_path(path) {
            Ok(Some(source)) => Ok(source),
            Ok(None) => Err(format!("Unsupported document type: '{}'", path.display())),
            Err(e) => Err(format!("Failed to read '{}': {}", path.display(), e)),
        };
    }
    library.load(input).map_err(|e| e.to_string())
}

fn default_title(input: &str) -> Option<String> {
    Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace(['-', '_'], " "))
}

fn mount(
    input: &str,
    title: Option<&str>,
    config: &EditorConfig,
    library: &TemplateLibrary,
) -> Result<EditorSession<CliHost>, String> {
    let source = open_source(input, library)?;
    let fallback_title = default_title(input);
    let title = title.or(fallback_title.as_deref());
    let session = EditorSession::mount_source(CliHost::default(), config.clone(), source, title);
    if session.load_state() == LoadState::Failed {
        return Err(format!("Could not open '{input}'"));
    }
    Ok(session)
}

fn cmd_render(input: &str, config: &EditorConfig, library: &TemplateLibrary) -> Result<(), String> {
    let session = mount(input, None, config, library)?;
    println!("{}", session.markup());
    Ok(())
}

fn cmd_text(input: &str, config: &EditorConfig, library: &TemplateLibrary) -> Result<(), String> {
    let session = mount(input, None, config, library)?;
    let text = visible_text(session.surface().document());
    if text.is_empty() {
        println!("(empty)");
    } else {
        println!("{text}");
    }
    Ok(())
}

fn cmd_export(
    input: &str,
    format: Option<ExportFormat>,
    title: Option<&str>,
    output: Option<PathBuf>,
    config: &EditorConfig,
    library: &TemplateLibrary,
) -> Result<(), String> {
    let mut session = mount(input, title, config, library)?;
    let format = format.unwrap_or(config.export_format);
    session.export(format).map_err(|e| e.to_string())?;

    let host = session.close();
    for artifact in host.downloads {
        let target = match &output {
            Some(path) if path.is_dir() => path.join(&artifact.file_name),
            Some(path) => path.clone(),
            None => PathBuf::from(&artifact.file_name),
        };
        fs::write(&target, &artifact.bytes)
            .map_err(|e| format!("Failed to write '{}': {}", target.display(), e))?;
        println!("{}", target.display());
    }
    Ok(())
}

fn cmd_print(
    input: &str,
    output: Option<PathBuf>,
    config: &EditorConfig,
    library: &TemplateLibrary,
) -> Result<(), String> {
    let mut session = mount(input, None, config, library)?;
    session.print();
    let host = session.close();
    let html = host.print_view.unwrap_or_default();
    match output {
        Some(path) => fs::write(&path, html)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e)),
        None => {
            print!("{html}");
            Ok(())
        }
    }
}

fn cmd_templates(library: &TemplateLibrary) -> Result<(), String> {
    let entries = library.list().map_err(|e| e.to_string())?;
    for entry in entries {
        println!("{}\t{}", entry.kind.extension(), entry.name);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LEGALDOC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = EditorConfig::load();
    if let Some(dir) = args.assets_dir {
        config.assets_dir = dir;
    }
    let library = TemplateLibrary::new(config.assets_dir.clone());

    let result = match args.command {
        Commands::Render { input } => cmd_render(&input, &config, &library),
        Commands::Text { input } => cmd_text(&input, &config, &library),
        Commands::Export {
            input,
            format,
            title,
            output,
        } => cmd_export(&input, format, title.as_deref(), output, &config, &library),
        Commands::Print { input, output } => cmd_print(&input, output, &config, &library),
        Commands::Templates => cmd_templates(&library),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

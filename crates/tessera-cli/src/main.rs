use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tessera::{
    App, AppOptions, CollectingSink, CompiledProgram, EvalContext, Expression, MoveStrategy,
    RenderConfig, RouteContext, Tables, Value, evaluate,
};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Render and inspect compiled Tessera programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a compiled program to HTML with its initial state
    Render {
        /// Path to the compiled program (JSON)
        program: PathBuf,
        /// Renderer configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Keep comment markers in the output
        #[arg(long)]
        markers: bool,
        /// Keyed list move strategy: `lis` or `reinsert`
        #[arg(long)]
        move_strategy: Option<MoveStrategy>,
        /// Route path to render for
        #[arg(long)]
        path: Option<String>,
        /// Write the HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mount a compiled program and report every diagnostic
    Check {
        /// Path to the compiled program (JSON)
        program: PathBuf,
    },
    /// Evaluate a compiled expression against a state object
    Eval {
        /// The expression, as JSON
        expression: String,
        /// State fields, as a JSON object
        #[arg(long)]
        state: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Render {
            program,
            config,
            markers,
            move_strategy,
            path,
            output,
        } => render(RenderArgs {
            program,
            config,
            markers,
            move_strategy,
            path,
            output,
        }),
        Commands::Check { program } => check(&program),
        Commands::Eval { expression, state } => eval(&expression, state.as_deref()),
    };

    if let Err(error) = result {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

struct RenderArgs {
    program: PathBuf,
    config: Option<PathBuf>,
    markers: bool,
    move_strategy: Option<MoveStrategy>,
    path: Option<String>,
    output: Option<PathBuf>,
}

fn load_program(path: &Path) -> Result<Arc<CompiledProgram>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let program = CompiledProgram::from_json(&source)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(Arc::new(program))
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    let Some(path) = path else {
        return Ok(RenderConfig::default());
    };
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("parsing {}", path.display()))
}

fn render(args: RenderArgs) -> Result<()> {
    let program = load_program(&args.program)?;
    let mut config = load_config(args.config.as_deref())?;
    if args.markers {
        config.markers = true;
    }
    if let Some(strategy) = args.move_strategy {
        config.move_strategy = strategy;
    }
    log::info!("rendering {} ({strategy})", args.program.display(), strategy = config.move_strategy);

    let route = RouteContext {
        path: args.path.unwrap_or_default(),
        ..RouteContext::default()
    };
    let mut app = App::new(program, AppOptions::default().with_config(config).with_route(route));
    app.mount();
    let html = app.to_html();

    match args.output {
        Some(output) => fs::write(&output, html)
            .with_context(|| format!("writing {}", output.display()))?,
        None => println!("{html}"),
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let program = load_program(path)?;
    let sink = CollectingSink::new();
    let mut app = App::new(program, AppOptions::default().with_diagnostics(sink.clone()));
    app.mount();
    app.unmount();

    let diagnostics = sink.diagnostics();
    for diagnostic in &diagnostics {
        println!("{diagnostic}");
    }
    if !diagnostics.is_empty() {
        bail!("{} diagnostic(s) in {}", diagnostics.len(), path.display());
    }
    println!("{}: ok", path.display());
    Ok(())
}

fn eval(expression: &str, state: Option<&str>) -> Result<()> {
    let expression: Expression =
        serde_json::from_str(expression).context("parsing the expression")?;
    let state = match state {
        Some(source) => {
            let value: Value = serde_json::from_str(source).context("parsing the state")?;
            if value.as_object().is_none() {
                bail!("state must be a JSON object, got {}", value.type_name());
            }
            value
        }
        None => Value::object(Vec::<(&str, Value)>::new()),
    };
    let tables = Tables::default();
    let result = evaluate(&expression, &EvalContext::new(&state, &tables));
    let json = serde_json::Value::from(result);
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

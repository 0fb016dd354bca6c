mod input;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use tether_core::{try_parse, Value};
use tether_eval::{Bound, Effects, Engine, EngineConfig, NodeId};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Tether binding expression toolkit.
#[derive(Parser)]
#[command(name = "tether", version, about = "Tether binding expression toolkit")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Engine configuration file (TOML, `[engine]` table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and print its AST
    Parse {
        /// Expression text, e.g. "gt(user.age, 18)"
        expr: String,
    },

    /// Evaluate an expression against a JSON context file
    Eval {
        /// Expression text
        expr: String,
        /// JSON object whose top-level keys become contexts
        #[arg(long)]
        context: Option<PathBuf>,
        /// Treat the text as an interpolated template ("Hi @{user.name}")
        #[arg(long)]
        template: bool,
    },

    /// Bind an expression, apply writes and print every notification
    Watch {
        /// Expression text
        expr: String,
        /// JSON object whose top-level keys become contexts
        #[arg(long)]
        context: PathBuf,
        /// Write to apply, as id:path=json (repeatable, applied in order)
        #[arg(long = "set", value_name = "ID:PATH=JSON")]
        set: Vec<String>,
        /// Treat the text as an interpolated template
        #[arg(long)]
        template: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                report_error(&e.to_string(), cli.output, cli.quiet);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    debug!("engine config: {:?}", config);

    match cli.command {
        Commands::Parse { expr } => cmd_parse(&expr, cli.output, cli.quiet),
        Commands::Eval {
            expr,
            context,
            template,
        } => cmd_eval(
            &expr,
            context.as_deref(),
            template,
            config,
            cli.output,
            cli.quiet,
        ),
        Commands::Watch {
            expr,
            context,
            set,
            template,
        } => cmd_watch(&expr, &context, &set, template, config, cli.output, cli.quiet),
    }
}

fn cmd_parse(text: &str, output: OutputFormat, quiet: bool) {
    let expr = match try_parse(text) {
        Ok(expr) => expr,
        Err(e) => {
            report_error(
                &format!("invalid expression '{}': {}", text, e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };
    match output {
        OutputFormat::Text => println!("{}", expr),
        OutputFormat::Json => print_json(&expr),
    }
}

/// A single root node declaring every context from the file.
fn engine_with_contexts(
    config: EngineConfig,
    file: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> (Engine, NodeId) {
    let mut engine = Engine::with_config(config);
    let root = match engine.attach(None) {
        Ok(n) => n,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let contexts = match file.map(input::load_contexts).transpose() {
        Ok(c) => c.unwrap_or_default(),
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    debug!("declaring {} context(s)", contexts.len());
    for context in contexts {
        if let Err(e) = engine.declare_context(root, context) {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
    (engine, root)
}

/// Expressions are checked up front so the CLI reports malformed input
/// instead of echoing it back as a string.
fn check_expression(text: &str, template: bool, output: OutputFormat, quiet: bool) {
    if template {
        return;
    }
    if let Err(e) = try_parse(text) {
        report_error(
            &format!("invalid expression '{}': {}", text, e),
            output,
            quiet,
        );
        process::exit(1);
    }
}

fn cmd_eval(
    text: &str,
    context: Option<&Path>,
    template: bool,
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    check_expression(text, template, output, quiet);
    let (engine, root) = engine_with_contexts(config, context, output, quiet);
    let value = if template {
        engine.evaluate_template_text(root, text)
    } else {
        engine.evaluate_text(root, text)
    };
    print_value(&value, output);
}

fn cmd_watch(
    text: &str,
    context: &Path,
    sets: &[String],
    template: bool,
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    check_expression(text, template, output, quiet);
    let assignments = match sets
        .iter()
        .map(|s| input::parse_assignment(s))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(a) => a,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let (mut engine, root) = engine_with_contexts(config, Some(context), output, quiet);
    let received: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    let callback = move |v: &Value, _: &mut Effects| sink.borrow_mut().push(v.clone());

    let bound = if template {
        engine.bind_template(root, text, callback)
    } else {
        engine.bind(root, text, callback)
    };
    let Bound { value, .. } = match bound {
        Ok(b) => b,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    print_event("initial", None, &value, output);

    for assignment in assignments {
        let label = format!("{}:{}", assignment.context_id, assignment.path);
        let written = engine.set_at_path(
            root,
            &assignment.context_id,
            &assignment.path,
            assignment.value,
        );
        if let Err(e) = written {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
        for value in received.borrow_mut().drain(..) {
            print_event("notify", Some(&label), &value, output);
        }
    }
}

fn print_value(value: &Value, output: OutputFormat) {
    match output {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => print_json(value),
    }
}

fn print_event(event: &str, write: Option<&str>, value: &Value, output: OutputFormat) {
    match output {
        OutputFormat::Text => match write {
            Some(w) => println!("{} -> {}", w, value),
            None => println!("{}", value),
        },
        OutputFormat::Json => {
            let mut obj = serde_json::json!({ "event": event, "value": value });
            if let Some(w) = write {
                obj["write"] = serde_json::Value::String(w.to_string());
            }
            println!("{}", obj);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

mod config;

use std::{
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::debug;
use qfilter::{
    parser, sql::SqlAdapter, Compiler, IdentifierResolution, NamingStrategy, Part, Query,
    RenderContext, ValidationMode,
};
use serde_json::json;

use config::Config;

/// Registry name for the adapter built from `--dialect`.
const DIALECT_ADAPTER: &str = "dialect";

/// qfilter compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a filter to SQL or a document query
    Compile(CompileArgs),
    /// Print the parsed filter as JSON
    Parse(InputArgs),
    /// Report every structural problem in a filter
    Validate(InputArgs),
    /// Fix unbalanced brackets, unterminated strings and dangling operators
    Repair(RepairArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// The filter text. If empty, stdin will be used.
    filter: Option<String>,
}

#[derive(Debug, Args)]
struct RepairArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Fail when the repaired text is still invalid
    #[arg(long)]
    check: bool,
}

#[derive(Debug, Args)]
struct CompileArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Adapter to render with: sql, postgres or document
    #[arg(short, long)]
    adapter: Option<String>,
    /// SQL dialect to render with, e.g. `postgres`. Takes precedence over `--adapter`.
    #[arg(short, long)]
    dialect: Option<String>,
    /// Base table, or collection for the document adapter
    #[arg(short, long)]
    table: Option<String>,
    /// Fields to drop from the query
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,
    /// Only these fields may appear in the query
    #[arg(long, value_delimiter = ',')]
    allow: Vec<String>,
    /// Columns to select instead of every column
    #[arg(long, value_delimiter = ',')]
    select: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    group_by: Vec<String>,
    #[arg(long)]
    naming: Option<NamingStrategy>,
    #[arg(long)]
    validation: Option<ValidationMode>,
    #[arg(long)]
    resolution: Option<IdentifierResolution>,
    /// Comma-separated parts to emit, in order, e.g. `select,from,where`
    #[arg(long)]
    parts: Option<String>,
    /// Inline the arguments into the SQL text
    #[arg(long)]
    explain: bool,
    /// Print SQL and arguments as one JSON object
    #[arg(long)]
    json: bool,
}

fn read_input(input: InputArgs) -> Result<String> {
    match input.filter {
        Some(filter) => Ok(filter),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("reading filter from stdin")?;
            Ok(buffer.trim_end().to_string())
        }
    }
}

fn compile(args: CompileArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut options = config.options();
    if let Some(naming) = args.naming {
        options.naming_strategy = naming;
    }
    if let Some(validation) = args.validation {
        options.validation = validation;
    }
    if let Some(resolution) = args.resolution {
        options.identifier_resolution = resolution;
    }
    debug!("compiling with {options:?}");

    let compiler = Compiler::new(options);
    let or_config = |flag: Vec<String>, file: &[String]| {
        if flag.is_empty() {
            file.to_vec()
        } else {
            flag
        }
    };
    compiler.set_ignored_fields(or_config(args.ignore, &config.ignore));
    let allow = or_config(args.allow, &config.allow);
    compiler.set_whitelist_active(config.whitelist || !allow.is_empty());
    compiler.set_allowed_fields(allow);
    compiler.set_selected_fields(or_config(args.select, &config.select));
    compiler.set_group_by(or_config(args.group_by, &config.group_by));

    let filter = read_input(args.input)?;
    compiler.parse(&filter)?;

    let mut ctx = RenderContext {
        table: args.table.or(config.table),
        ..Default::default()
    };
    for (relation, collection) in config.collections {
        ctx = ctx.with_collection(relation, collection);
    }
    let adapter = match &args.dialect {
        Some(name) => {
            let sql = dialect_adapter(name, compiler.options().regex_operator.as_deref())?;
            compiler.register_adapter(DIALECT_ADAPTER, Arc::new(sql));
            DIALECT_ADAPTER.to_string()
        }
        None => args.adapter.unwrap_or(config.adapter),
    };
    let parts = args.parts.as_deref().map(Part::parse_list);
    let parts = parts.as_deref();

    if args.explain {
        println!("{}", compiler.render_explain(&adapter, &ctx, parts)?);
        return Ok(());
    }
    match compiler.render_query(&adapter, &ctx, parts)? {
        Query::Sql(query) if args.json => {
            let out = json!({"sql": query.sql, "args": query.args_json()});
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Query::Sql(query) => {
            println!("{}", query.sql);
            if !query.args.is_empty() {
                println!("-- args: {}", serde_json::to_string(&query.args_json())?);
            }
        }
        Query::Document(query) => println!("{}", serde_json::to_string_pretty(&query)?),
    }
    Ok(())
}

/// The SQL adapter registered for `--dialect`.
fn dialect_adapter(name: &str, regex_operator: Option<&str>) -> Result<SqlAdapter> {
    let Some(dialect) = qfilter::sql::dialect_by_name(name) else {
        bail!("unknown dialect `{name}`");
    };
    let sql = SqlAdapter::with_dialect(dialect).named(DIALECT_ADAPTER);
    Ok(match regex_operator {
        Some(op) => sql.with_regex_operator(op),
        None => sql,
    })
}

fn parse(input: InputArgs) -> Result<()> {
    let document = parser::parse(&read_input(input)?);
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn validate(input: InputArgs) -> Result<()> {
    let problems = parser::diagnose(&read_input(input)?);
    if problems.is_empty() {
        println!("ok");
        return Ok(());
    }
    for problem in &problems {
        println!("{problem}");
        println!("  near `{}`", problem.context);
        if !problem.suggestion.is_empty() {
            println!("  {}", problem.suggestion);
        }
    }
    bail!("{} problem(s) found", problems.len())
}

fn repair(args: RepairArgs) -> Result<()> {
    let filter = read_input(args.input)?;
    let repaired = if args.check {
        parser::repair_checked(&filter)?
    } else {
        parser::repair(&filter)
    };
    println!("{repaired}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Cli::parse();
    let result = match args.command {
        Command::Compile(args) => compile(args),
        Command::Parse(input) => parse(input),
        Command::Validate(input) => validate(input),
        Command::Repair(args) => repair(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

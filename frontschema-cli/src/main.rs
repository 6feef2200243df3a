use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use frontschema::io::{DataFormat, FsReader, Reader, SerdeDecoder, StructuredDecoder};
use frontschema::pipeline::{parse_config, PipelineConfig, PipelineOrchestrator};
use frontschema::schema::{parse_schema, DirectiveScope};
use frontschema::template::{TemplateDefinition, TemplateRenderer, TemplateVariableResolver};
use frontschema::FrontmatterProcessor;
use std::path::PathBuf;
use std::process;

/// frontschema: compile Markdown frontmatter into one document through an annotated JSON Schema
#[derive(Parser)]
#[command(name = "frontschema", version, about)]
struct Cli {
    /// Output format for command results
    #[arg(long, default_value = "yaml", global = true)]
    format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: extract, shape, aggregate, render, write
    Run {
        /// Pipeline config file (YAML or JSON); flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Schema file
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Input glob or directory (repeatable)
        #[arg(long = "input")]
        inputs: Vec<String>,
        /// Output file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Template file, overriding the schema's x-template
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output format: json, yaml, xml, or text
        #[arg(long)]
        output_format: Option<DataFormat>,
        /// Fail documents that do not match the item schema
        #[arg(long)]
        strict: bool,
        /// Skip documents without a frontmatter block
        #[arg(long)]
        require_frontmatter: bool,
        /// Render without writing the output file
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a document's frontmatter and body
    Extract {
        /// Markdown file
        file: PathBuf,
    },

    /// List the directives collected from a schema
    Directives {
        /// Schema file
        schema: PathBuf,
    },

    /// Render a template against a JSON or YAML data file
    Render {
        /// Template file
        template: PathBuf,
        /// Data file
        data: PathBuf,
        /// Output format (defaults to the template's format)
        #[arg(long)]
        output_format: Option<DataFormat>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Run {
            config,
            schema,
            inputs,
            output,
            template,
            output_format,
            strict,
            require_frontmatter,
            dry_run,
        } => {
            let mut config = match config {
                Some(path) => parse_config(&path)?,
                None => PipelineConfig::new(
                    schema.clone().ok_or("--schema is required without --config")?,
                    Vec::new(),
                    output.clone().ok_or("--output is required without --config")?,
                ),
            };

            if let Some(schema) = schema {
                config.schema = schema;
            }
            if !inputs.is_empty() {
                config.inputs = inputs;
            }
            if let Some(output) = output {
                config.output = output;
            }
            if template.is_some() {
                config.template = template;
            }
            if output_format.is_some() {
                config.output_format = output_format;
            }
            config.strict |= strict;
            config.require_frontmatter |= require_frontmatter;
            config.dry_run |= dry_run;

            log::debug!(
                "Running pipeline: schema {}, {} input pattern(s)",
                config.schema.display(),
                config.inputs.len()
            );
            let report = PipelineOrchestrator::new(config).run()?;
            let mut summary = report.summary();
            if !report.written {
                summary["rendered"] = serde_json::Value::String(report.rendered.clone());
            }
            print_output(&summary, &cli.format)?;
        }

        Command::Extract { file } => {
            let raw = FsReader.read(&file)?;
            let parsed = FrontmatterProcessor::new(&SerdeDecoder).extract(&raw)?;
            print_output(
                &serde_json::json!({
                    "file": file,
                    "has_frontmatter": parsed.has_frontmatter,
                    "frontmatter": parsed.header,
                    "body": parsed.body,
                }),
                &cli.format,
            )?;
        }

        Command::Directives { schema } => {
            let definition = parse_schema(&schema, &FsReader, &SerdeDecoder)?;
            let nodes: Vec<_> = definition
                .directive_nodes()
                .iter()
                .map(|node| {
                    let (scope, target) = match &node.scope {
                        DirectiveScope::Document { target } => {
                            ("document", Some(target.to_string()))
                        }
                        DirectiveScope::Aggregate => ("aggregate", None),
                    };
                    let path = if node.path.is_root() {
                        "<root>".to_string()
                    } else {
                        node.path.to_string()
                    };
                    let directives: Vec<String> =
                        node.directives.iter().map(|d| d.to_string()).collect();
                    serde_json::json!({
                        "path": path,
                        "type": node.declared_type.map(|t| t.as_str()),
                        "scope": scope,
                        "target": target,
                        "directives": directives,
                    })
                })
                .collect();

            print_output(
                &serde_json::json!({
                    "schema": schema,
                    "template": definition.template_ref(),
                    "template_items": definition.items_template_ref(),
                    "frontmatter_part": definition.frontmatter_part().map(|p| p.to_string()),
                    "nodes": nodes,
                }),
                &cli.format,
            )?;
        }

        Command::Render {
            template,
            data,
            output_format,
        } => {
            let template = TemplateDefinition::load(&template, &FsReader, &SerdeDecoder)?;
            let data_format = match DataFormat::from_path(&data) {
                DataFormat::Json => DataFormat::Json,
                _ => DataFormat::Yaml,
            };
            let data = SerdeDecoder.decode(&FsReader.read(&data)?, data_format)?;
            let format = output_format.unwrap_or_else(|| template.format());
            let renderer = TemplateRenderer::new(TemplateVariableResolver::new()?);
            let rendered = renderer.render(&template, &data, format)?;
            print!("{rendered}");
        }
    }

    Ok(())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}

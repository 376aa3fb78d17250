//! EduEDA CLI - teacher-count charts from CSV datasets
//!
//! ```bash
//! edueda serve                                   # Start HTTP server (port 3000)
//! edueda aggregate teachers.csv --age-group 25-29  # Chart JSON for one age group
//! edueda parse teachers.csv                      # Parsed, coerced records as JSON
//! edueda scale 4200                              # Axis bounds for a maximum value
//! edueda facets                                  # Selectable age groups
//! ```

use clap::{Parser, Subcommand};
use edueda::{
    chart_from_file, parse_csv_file_auto, parse_str, step_size, upper_bound, AggregateOptions,
    AppConfig, DatasetSchema, FacetFilter,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "edueda")]
#[command(about = "Explore teacher-count education data as bar charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output the coerced records as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate a CSV file into chart JSON
    Aggregate {
        /// Input CSV file
        input: PathBuf,

        /// Age group to keep ("All" disables filtering)
        #[arg(short, long, default_value = "All")]
        age_group: String,

        /// Count column to sum per year (default: EDUEDA_METRIC or "Overall Total")
        #[arg(short, long)]
        metric: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show y-axis bounds for a data maximum
    Scale {
        /// Largest value on the axis
        value: u64,
    },

    /// List selectable age groups
    Facets,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: EDUEDA_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match AppConfig::from_env() {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref(), &config.schema),

        Commands::Aggregate {
            input,
            age_group,
            metric,
            output,
        } => {
            let options = AggregateOptions {
                facet: age_group.parse::<FacetFilter>()?,
                metric: metric.unwrap_or(config.metric.clone()),
            };
            cmd_aggregate(&input, &options, output.as_deref(), &config.schema)
        }

        Commands::Scale { value } => cmd_scale(value),

        Commands::Facets => cmd_facets(),

        Commands::Serve { port } => {
            let config = AppConfig {
                port: port.unwrap_or(config.port),
                ..config
            };
            edueda::server::start_server(config).await?;
            Ok(())
        }
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
    schema: &DatasetSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let dataset = match delimiter {
        Some(d) => {
            let content = fs::read_to_string(input)?;
            parse_str(&content, d, "utf-8".to_string(), schema)?
        }
        None => parse_csv_file_auto(input, schema)?,
    };

    eprintln!("   Encoding: {}", dataset.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(dataset.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Metrics: {}", dataset.metrics().join(", "));
    eprintln!("✅ Parsed {} records", dataset.records.len());

    let json = serde_json::to_string_pretty(&dataset.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_aggregate(
    input: &Path,
    options: &AggregateOptions,
    output: Option<&Path>,
    schema: &DatasetSchema,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📊 Aggregating: {}", input.display());

    let result = chart_from_file(input, schema, options)?;

    eprintln!("   Rows: {}", result.csv_info.row_count);
    for (label, value) in result.chart.labels.iter().zip(&result.chart.values) {
        eprintln!("   {:>6}  {}", label, value);
    }
    eprintln!(
        "   Y axis: 0..{} (step {})",
        result.chart.y_axis.bounds.max, result.chart.y_axis.bounds.step
    );

    let json = serde_json::to_string_pretty(&result.chart)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_scale(value: u64) -> Result<(), Box<dyn std::error::Error>> {
    match (upper_bound(value), step_size(value)) {
        (Some(max), Some(step)) => {
            println!("{}", serde_json::json!({ "value": value, "max": max, "step": step }));
            Ok(())
        }
        _ => Err(format!("cannot scale an axis to {}", value).into()),
    }
}

fn cmd_facets() -> Result<(), Box<dyn std::error::Error>> {
    for option in FacetFilter::options() {
        println!("{}", option);
    }
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

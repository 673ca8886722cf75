use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gridlens_lib::{
    config::{read_config, AnalysisConfig},
    explore::{
        explore, explore_groups, first_month, first_month_table, preview, ExploreOptions,
        MonthRange, YearMonth,
    },
    help::{help_text, HelpKey},
    io::cache::{CsvSource, DatasetCache},
    plot::{
        figure_from_decomposition, figure_from_groups, figure_from_spectrogram,
        figure_from_timeseries, AnalysisOutcome, Figure, PlotBackend,
    },
    select::{select_area, select_filtered, GroupSeries},
    signal::CategoricalFilter,
    AnalysisError, Analyzer,
};
use log::{info, warn};
use render::PngBackend;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod render;

/// Exit status when an analysis reports a user-facing error.
const ANALYSIS_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "gridlens",
    version,
    about = "Explore hourly energy production: preview, STL decomposition and spectrograms"
)]
struct Cli {
    /// TOML file with analysis defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Production CSV (overrides data_path from the config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SeriesArgs {
    /// Price area, e.g. NO1
    #[arg(long)]
    area: String,
    /// Production group, e.g. hydro
    #[arg(long)]
    group: String,
    /// Render the figure to a PNG instead of printing JSON
    #[arg(long)]
    out: Option<PathBuf>,
}

impl SeriesArgs {
    fn filter(&self) -> CategoricalFilter {
        CategoricalFilter::new(&self.area, &self.group)
    }
}

#[derive(Args)]
struct AreaArgs {
    /// Price area, e.g. NO1
    #[arg(long)]
    area: String,
    /// Production group; every group of the area when omitted
    #[arg(long)]
    group: Option<String>,
    /// Render the figure to a PNG instead of printing JSON
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum HelpTopic {
    #[value(name = "stl-intro")]
    StlIntro,
    #[value(name = "stl-interpretation")]
    StlInterpretation,
    #[value(name = "spectrogram-intro")]
    SpectrogramIntro,
    #[value(name = "spectrogram-key-frequencies")]
    SpectrogramKeyFrequencies,
}

impl HelpTopic {
    fn key(&self) -> HelpKey {
        match self {
            HelpTopic::StlIntro => HelpKey::StlIntro,
            HelpTopic::StlInterpretation => HelpKey::StlInterpretation,
            HelpTopic::SpectrogramIntro => HelpKey::SpectrogramIntro,
            HelpTopic::SpectrogramKeyFrequencies => HelpKey::SpectrogramKeyFrequencies,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first rows, shape and category keys of the dataset
    Preview {
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Line chart of one series, or of every group in an area, optionally
    /// month-filtered, smoothed and standardized
    Plot {
        #[command(flatten)]
        series: AreaArgs,
        /// First month to include (YYYY-MM)
        #[arg(long)]
        from: Option<String>,
        /// Last month to include (YYYY-MM); defaults to --from
        #[arg(long)]
        to: Option<String>,
        /// Trailing rolling mean over 5 samples
        #[arg(long)]
        smooth: bool,
        /// Z-score the (smoothed) values
        #[arg(long)]
        standardize: bool,
        /// Only the first calendar month of the series
        #[arg(long, conflicts_with_all = ["from", "to"])]
        first_month: bool,
    },
    /// First calendar month of every production group in an area
    FirstMonth {
        #[arg(long)]
        area: String,
    },
    /// Seasonal-trend decomposition (STL)
    Stl {
        #[command(flatten)]
        series: SeriesArgs,
        #[arg(long)]
        period: Option<usize>,
        #[arg(long)]
        seasonal_window: Option<usize>,
        #[arg(long)]
        trend_window: Option<usize>,
        #[arg(long)]
        robust: Option<bool>,
    },
    /// Short-time power spectrum in dB
    Spectrogram {
        #[command(flatten)]
        series: SeriesArgs,
        #[arg(long)]
        window_length: Option<usize>,
        #[arg(long)]
        window_overlap: Option<usize>,
    },
    /// Print the reading guides shown next to the analysis figures
    HelpText {
        topic: Option<HelpTopic>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = Some(data.clone());
    }
    match cli.command {
        Commands::Preview { rows } => cmd_preview(&config, rows),
        Commands::Plot {
            series,
            from,
            to,
            smooth,
            standardize,
            first_month,
        } => {
            let months = match (from, to) {
                (None, None) => None,
                (from, to) => Some((from, to)),
            };
            cmd_plot(&config, &series, months, smooth, standardize, first_month)
        }
        Commands::FirstMonth { area } => cmd_first_month(&config, &area),
        Commands::Stl {
            series,
            period,
            seasonal_window,
            trend_window,
            robust,
        } => {
            config.period = period.unwrap_or(config.period);
            config.seasonal_window = seasonal_window.unwrap_or(config.seasonal_window);
            config.trend_window = trend_window.or(config.trend_window);
            config.robust = robust.unwrap_or(config.robust);
            cmd_stl(&config, &series)
        }
        Commands::Spectrogram {
            series,
            window_length,
            window_overlap,
        } => {
            if let Some(length) = window_length {
                config.window_length = length;
            }
            config.window_overlap = window_overlap.or(config.window_overlap);
            cmd_spectrogram(&config, &series)
        }
        Commands::HelpText { topic } => cmd_help_text(topic),
    }
}

fn dataset_cache(config: &AnalysisConfig) -> Result<DatasetCache<CsvSource>> {
    let path = config
        .data_path
        .as_deref()
        .ok_or_else(|| anyhow!("no dataset given; pass --data or set data_path in the config"))?;
    Ok(DatasetCache::new(CsvSource::new(path)))
}

fn cmd_preview(config: &AnalysisConfig, rows: Option<usize>) -> Result<ExitCode> {
    let cache = dataset_cache(config)?;
    let dataset = cache.get()?;
    let summary = preview(&dataset, rows.unwrap_or(config.preview_rows));
    println!("{}", serde_json::to_string(&summary)?);
    Ok(ExitCode::SUCCESS)
}

fn parse_months(from: Option<String>, to: Option<String>) -> Result<MonthRange, AnalysisError> {
    let start: YearMonth = match (&from, &to) {
        (Some(from), _) => from.parse()?,
        (None, Some(to)) => to.parse()?,
        (None, None) => return Err(AnalysisError::invalid("Month range needs --from or --to")),
    };
    let end: YearMonth = match &to {
        Some(to) => to.parse()?,
        None => start,
    };
    MonthRange::new(start, end)
}

fn cmd_plot(
    config: &AnalysisConfig,
    args: &AreaArgs,
    months: Option<(Option<String>, Option<String>)>,
    smooth: bool,
    standardize: bool,
    only_first_month: bool,
) -> Result<ExitCode> {
    let cache = dataset_cache(config)?;
    let dataset = cache.get()?;
    let opts = months
        .map(|(from, to)| parse_months(from, to))
        .transpose()
        .map(|months| ExploreOptions {
            months,
            smooth,
            standardize,
        });
    let y_label = if standardize { "z-score" } else { "Quantity (kWh)" };
    let figure = opts.and_then(|opts| match &args.group {
        Some(group) => {
            let filter = CategoricalFilter::new(&args.area, group);
            let mut series = select_filtered(&dataset, &filter)?;
            if only_first_month {
                series = first_month(&series);
            }
            let series = explore(&series, &opts)?;
            Ok::<Figure, AnalysisError>(figure_from_timeseries(
                &format!("{} production in {}", filter.production_group, filter.price_area),
                y_label,
                &series,
                config.max_plot_points,
                0x1F77B4,
            ))
        }
        None => {
            let mut groups = select_area(&dataset, &args.area)?;
            if only_first_month {
                groups = groups
                    .into_iter()
                    .map(|g| GroupSeries {
                        series: first_month(&g.series),
                        production_group: g.production_group,
                    })
                    .collect();
            }
            let groups = explore_groups(&groups, &opts)?;
            Ok(figure_from_groups(
                &format!("Production in {}", args.area),
                y_label,
                &groups,
                config.max_plot_points,
            ))
        }
    });
    emit(figure.into(), args.out.as_deref())
}

fn cmd_first_month(config: &AnalysisConfig, area: &str) -> Result<ExitCode> {
    let cache = dataset_cache(config)?;
    let dataset = cache.get()?;
    match select_area(&dataset, area) {
        Ok(groups) => {
            println!("{}", serde_json::to_string(&first_month_table(&groups))?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => emit(AnalysisOutcome::Error(err), None),
    }
}

fn cmd_stl(config: &AnalysisConfig, args: &SeriesArgs) -> Result<ExitCode> {
    let cache = dataset_cache(config)?;
    let dataset = cache.get()?;
    let analyzer = Analyzer::detect();
    let filter = args.filter();
    let figure = select_filtered(&dataset, &filter)
        .and_then(|series| analyzer.decompose(&series, &config.stl_params()))
        .map(|result| figure_from_decomposition(&result, &filter, config.max_plot_points));
    emit(figure.into(), args.out.as_deref())
}

fn cmd_spectrogram(config: &AnalysisConfig, args: &SeriesArgs) -> Result<ExitCode> {
    let cache = dataset_cache(config)?;
    let dataset = cache.get()?;
    let analyzer = Analyzer::detect();
    let filter = args.filter();
    let figure = select_filtered(&dataset, &filter)
        .and_then(|series| {
            analyzer.spectrogram(&series, config.window_length, config.window_overlap())
        })
        .map(|result| figure_from_spectrogram(&result, &filter));
    emit(figure.into(), args.out.as_deref())
}

fn cmd_help_text(topic: Option<HelpTopic>) -> Result<ExitCode> {
    match topic {
        Some(topic) => println!("{}", help_text(topic.key())),
        None => {
            for key in HelpKey::ALL {
                println!("{}\n", help_text(key));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print or render an outcome. Analysis errors become JSON on stdout and exit status 2.
fn emit(outcome: AnalysisOutcome, out: Option<&Path>) -> Result<ExitCode> {
    match (&outcome, out) {
        (AnalysisOutcome::Error(err), _) => {
            warn!("analysis failed ({}): {}", err.kind(), err);
            println!("{}", serde_json::to_string(&outcome)?);
            Ok(ExitCode::from(ANALYSIS_FAILURE))
        }
        (AnalysisOutcome::Figure(fig), Some(path)) => {
            PngBackend::new(path)
                .draw(fig)
                .with_context(|| format!("rendering {}", path.display()))?;
            info!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        (AnalysisOutcome::Figure(_), None) => {
            println!("{}", serde_json::to_string(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

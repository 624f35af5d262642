use anyhow::Result;
use clap::Parser;
use ndarray::Array2;
use neurodec::grid::Hemisphere;
use neurodec::io::{load_predictors, read_coordinates, read_grid, Recording};
use neurodec::{ChannelSelection, DisplaySink, GridPredictors, RunContext, Settings, StreamDriver};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stream", about = "Real-time movement decoding replay")]
struct Args {
    /// settings.json with bands, windows and rates
    #[arg(long)]
    settings: PathBuf,

    /// recording.safetensors replayed sample by sample
    #[arg(long)]
    recording: PathBuf,

    /// directory with the four grid TSV halves
    #[arg(long)]
    grid_dir: PathBuf,

    /// electrodes.tsv with name/x/y/z rows
    #[arg(long)]
    electrodes: PathBuf,

    /// recording session name, used to pick the hemisphere
    #[arg(long)]
    session: String,

    /// trained models (weights_<i>/bias_<i>); omit to track labels only
    #[arg(long)]
    models: Option<PathBuf>,

    /// print one status line every N prediction cycles
    #[arg(long, default_value_t = 10)]
    report_every: usize,
}

/// Console sink: prints the newest estimate per active point plus the labels.
struct ConsoleSink {
    active: Vec<bool>,
    every: usize,
    updates: usize,
}

impl DisplaySink for ConsoleSink {
    fn update(&mut self, predictions: &Array2<f64>, label_con: &[f64], label_ipsi: &[f64]) {
        self.updates += 1;
        if self.every == 0 || self.updates % self.every != 0 {
            return;
        }
        let last = predictions.ncols() - 1;
        let newest: Vec<String> = self
            .active
            .iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(p, _)| format!("{p}:{:+.3}", predictions[[p, last]]))
            .collect();
        println!(
            "cycle {:>6}  pred [{}]  mov con {:+.3} ipsi {:+.3}",
            self.updates,
            newest.join(" "),
            label_con.last().copied().unwrap_or(0.0),
            label_ipsi.last().copied().unwrap_or(0.0),
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args.settings)?;
    let rec = Recording::load(&args.recording)?;
    println!(
        "Replaying {} ch × {} samples @ {} Hz",
        rec.data.nrows(),
        rec.data.ncols(),
        rec.sfreq
    );

    let grid = read_grid(&args.grid_dir)?;
    let selection = ChannelSelection::classify(&rec.ch_names, &settings.prefixes)?;
    let coords = read_coordinates(&args.electrodes, &rec.ch_names, &selection)?;
    let hemisphere = Hemisphere::from_session(&args.session);

    let ctx = RunContext::new(
        &settings,
        &rec.ch_names,
        &coords,
        &grid,
        hemisphere,
        rec.sfreq as usize,
        rec.line_noise,
    )?;

    let predictors = match &args.models {
        Some(path) => load_predictors(path, ctx.layout.total())?,
        None => {
            eprintln!("no models supplied; tracking labels only");
            GridPredictors::empty(ctx.layout.total())
        }
    };

    let mut sink = ConsoleSink {
        active: ctx.active.clone(),
        every: args.report_every,
        updates: 0,
    };
    let mut driver = StreamDriver::new(&ctx, predictors)?;
    driver.run(&rec.data, &mut sink)?;
    println!("Done: {} feature cycles", driver.cycles());

    Ok(())
}

use anyhow::Result;
use clap::Parser;
use neurodec::grid::Hemisphere;
use neurodec::io::{read_coordinates, read_grid, write_result, Recording, RunMeta};
use neurodec::{run_offline, ChannelSelection, RunContext, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "offline", about = "Batch feature extraction for one recording")]
struct Args {
    /// settings.json with bands, windows and rates
    #[arg(long)]
    settings: PathBuf,

    /// recording.safetensors (data, sfreq, line_noise, ch_names)
    #[arg(long)]
    recording: PathBuf,

    /// directory with the four grid TSV halves
    #[arg(long)]
    grid_dir: PathBuf,

    /// electrodes.tsv with name/x/y/z rows
    #[arg(long)]
    electrodes: PathBuf,

    /// subject id, recorded in the result file
    #[arg(long)]
    subject: String,

    /// recording session name, used to pick the hemisphere
    #[arg(long)]
    session: String,

    /// run id, recorded in the result file
    #[arg(long)]
    run: String,

    /// result safetensors output path
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args.settings)?;
    let rec = Recording::load(&args.recording)?;
    println!(
        "Loaded {} ch × {} samples @ {} Hz (line noise {} Hz)",
        rec.data.nrows(),
        rec.data.ncols(),
        rec.sfreq,
        rec.line_noise
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
    println!(
        "{} data channels, {} bands, {} grid points ({} active), step {} samples",
        ctx.n_data_channels(),
        ctx.n_bands(),
        ctx.layout.total(),
        ctx.active.iter().filter(|a| **a).count(),
        ctx.step
    );

    let result = run_offline(&rec.data, &ctx)?;
    println!("Extracted {} feature steps", result.sample_idx.len());

    let meta = RunMeta {
        subject: args.subject.clone(),
        session: args.session.clone(),
        run: args.run.clone(),
    };
    write_result(&args.output, &result, &ctx, &meta)?;
    println!("Written → {}", args.output.display());

    Ok(())
}

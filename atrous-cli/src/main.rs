//! Command line driver: decompose a PGX image and write every sub-band.
//!
//! Output `i` of the transform is written to `<prefix>-<i>.pgx`.

mod pgx;

use std::path::{Path, PathBuf};

use atrous::{
    BorderMode, EnergyThresholdCost, FullyDecomposedCost, Raster, TransformSettings,
    WaveletFamily, WaveletForwardTransform, WaveletInverseTransform,
    WaveletPacketInverseTransform, WaveletPacketTransform,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

#[derive(Parser)]
#[command(
    name = "atrous-cli",
    about = "Stationary wavelet decomposition of PGX images",
    long_about = "Stationary wavelet decomposition of PGX images.\n\n\
                  Every output sub-band is written as signed 32-bit PGX with its samples \
                  rounded to integers, so the files are a lossy export of the coefficients. \
                  Use --verify to check the reconstruction on the exact in-memory values."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pyramid transform following the low-pass branch
    Forward {
        #[command(flatten)]
        common: CommonArgs,
        /// Number of decomposition levels
        #[arg(short, long, default_value_t = 1)]
        levels: u32,
    },
    /// Wavelet packet transform
    Packet {
        #[command(flatten)]
        common: CommonArgs,
        /// Maximum depth of the packet tree
        #[arg(short, long, default_value_t = 1)]
        depth: u32,
        /// Only decompose sub-bands whose mean squared value exceeds this
        #[arg(long)]
        energy_threshold: Option<f64>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Input PGX image
    input: PathBuf,
    /// Prefix of the output files, written as `<prefix>-<index>.pgx` with
    /// samples rounded to signed 32-bit integers (lossy)
    output_prefix: String,
    /// Wavelet family: haar or 9/7
    #[arg(short, long, default_value_t = WaveletFamily::Haar)]
    family: WaveletFamily,
    /// Boundary extension: wrap, clamp, reflect, reflect101 or zeros
    #[arg(short, long, default_value_t = BorderMode::Wrap)]
    border: BorderMode,
    /// Number of tiles per level, 0 for one per thread
    #[arg(short, long, default_value_t = 0)]
    regions: usize,
    /// Decimation factor applied after filtering, 1 keeps the transform stationary
    #[arg(long, default_value_t = 1)]
    sub_sample: u32,
    /// Rebuild the input from the outputs and log the largest difference
    #[arg(long)]
    verify: bool,
}

impl CommonArgs {
    fn settings(&self) -> TransformSettings {
        TransformSettings::new(self.family)
            .with_border_mode(self.border)
            .with_number_of_regions(self.regions)
            .with_sub_sample_image_factor(self.sub_sample)
    }
}

fn log_progress(progress: f32) {
    log::debug!("progress {:.0}%", progress * 100.0);
}

fn write_outputs(prefix: &str, outputs: &[Raster]) -> Result<(), pgx::PgxError> {
    for (index, output) in outputs.iter().enumerate() {
        let path = format!("{}-{}.pgx", prefix, index);
        pgx::save_pgx(Path::new(&path), output)?;
        info!("wrote {} {}", path, output.region());
    }
    Ok(())
}

fn report_difference(input: &Raster, reconstructed: &Raster) {
    if input.region() != reconstructed.region() {
        warn!(
            "reconstruction covers {} instead of {}",
            reconstructed.region(),
            input.region()
        );
        return;
    }
    let difference = input
        .as_slice()
        .iter()
        .zip(reconstructed.as_slice())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    info!("largest reconstruction difference {:e}", difference);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Forward { common, levels } => {
            let settings = common.settings();
            settings.validate()?;
            let input = pgx::load_pgx(&common.input)?;

            let mut transform = WaveletForwardTransform::new(settings);
            transform.set_number_of_decompositions(levels);
            let outputs = transform.compute(&input, Some(&log_progress as &(dyn Fn(f32) + Sync)))?;
            write_outputs(&common.output_prefix, &outputs)?;

            if common.verify {
                let reconstructed = WaveletInverseTransform::new(settings).compute(&outputs, None)?;
                report_difference(&input, &reconstructed);
            }
        }
        Commands::Packet {
            common,
            depth,
            energy_threshold,
        } => {
            let settings = common.settings();
            settings.validate()?;
            let input = pgx::load_pgx(&common.input)?;

            let mut transform = WaveletPacketTransform::new(settings);
            match energy_threshold {
                Some(threshold) => transform.set_cost(EnergyThresholdCost::new(depth, threshold)),
                None => transform.set_cost(FullyDecomposedCost::new(depth)),
            }
            let leaves = transform.compute(&input, Some(&log_progress as &(dyn Fn(f32) + Sync)))?;
            info!("packet rule {:?}", transform.packet_rule());
            write_outputs(&common.output_prefix, &leaves)?;

            if common.verify {
                let reconstructed = WaveletPacketInverseTransform::new(settings).compute(
                    &leaves,
                    transform.packet_rule(),
                    None,
                )?;
                report_difference(&input, &reconstructed);
            }
        }
    }
    Ok(())
}

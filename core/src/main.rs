use clap::Parser;
use heatsweep_core::cli::{random_seed_from_env, workers_from_env, Cli};
use heatsweep_core::{
    load_patient_list, LinearPatchClassifier, PatientManifest, PreprocessOptions, Result,
    RunMetadata, RunOutput, SweepConfig, Sweeper, TextReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::process;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if !cli.img_folder.is_dir() {
        eprintln!("Error: {} is not a directory", cli.img_folder.display());
        process::exit(1);
    }

    match run(&cli) {
        Ok(output) => {
            println!("{}", TextReport::new(&output));
        }
        Err(e) => {
            error!("Sweep failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn run(cli: &Cli) -> Result<RunOutput> {
    let random_seed = random_seed_from_env()?;
    let workers = workers_from_env()?;
    info!("Random seed: {}, workers: {}", random_seed, workers);

    // Manifest, optionally restricted to a patient-id list.
    let mut manifest = PatientManifest::load(&cli.pat_csv)?;
    info!(
        "Loaded {} cases from {}",
        manifest.len(),
        cli.pat_csv.display()
    );
    if let Some(pat_list) = cli.pat_list() {
        let patient_ids = load_patient_list(pat_list)?;
        manifest.retain_patients(&patient_ids)?;
        info!("Restricted manifest to {} cases", manifest.len());
    }

    let classifier = LinearPatchClassifier::from_checkpoint(&cli.dl_state, &cli.net)?;

    let config = SweepConfig {
        patch_size: cli.patch_size,
        stride: cli.stride,
        batch_size: cli.batch_size,
        workers,
        preprocess: PreprocessOptions {
            img_height: cli.img_height,
            img_scale: cli.img_scale,
            equalize_hist: cli.equalize_hist(),
            featurewise_center: cli.featurewise_center(),
            featurewise_mean: cli.featurewise_mean,
        },
    };
    let sweeper = Sweeper::new(&classifier, config)?;

    info!("Generate prob heatmaps");
    let nb_cases = manifest.len();
    let progress = ProgressBar::new(nb_cases as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} cases ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut cases = Vec::with_capacity(nb_cases);
    for (i, label) in manifest.iter().enumerate() {
        let score = sweeper.score_case(&cli.img_folder, label)?;
        cases.push(score);
        progress.inc(1);
        info!("scored {}/{} cases", i + 1, nb_cases);
    }
    progress.finish_and_clear();
    info!("Done");

    let output = RunOutput {
        metadata: RunMetadata {
            net: cli.net.clone(),
            random_seed,
            workers,
            img_height: cli.img_height,
            img_scale: cli.img_scale,
            equalize_hist: cli.equalize_hist(),
            featurewise_center: cli.featurewise_center(),
            featurewise_mean: cli.featurewise_mean,
            patch_size: cli.patch_size,
            stride: cli.stride,
            batch_size: cli.batch_size,
        },
        cases,
    };

    info!("Saving result to {}", cli.out.display());
    heatsweep_core::output::write_output(&cli.out, &output)?;

    Ok(output)
}

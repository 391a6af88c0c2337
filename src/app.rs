//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initializes logging
//! - dispatches subcommands
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use nalgebra::DMatrix;

use crate::cli::{BasisArgs, Cli, Command, FitArgs, PcaArgs, PlotArgs, SynthArgs, TaraArgs, init_logging};
use crate::data::{
    CsvReferenceProvider, SampleSpec, a_chl, chlorophyll_basis, data_root_from_env, synthesize_spectrum,
    wavelength_grid,
};
use crate::domain::{FitConfig, PigmentKind, PigmentSource, Spectrum};
use crate::error::AppError;
use crate::io::export::{write_results_csv, write_spectrum, write_spectrum_csv};
use crate::io::fit_file::{build_fit_file, read_fit_json, write_fit_json};
use crate::io::ingest::load_table;

pub mod pipeline;

/// Entry point for the `oc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Basis(args) => handle_basis(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tara(args) => handle_tara(args),
        Command::Pca(args) => handle_pca(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&run.spectrum, &run.fit, &config)
    );
    print!("{}", crate::report::format_residual_note(&run.residuals));

    if config.plot {
        let plot = crate::plot::render_ascii_plot(&run.residuals, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        write_results_csv(path, &run.residuals)?;
        log::info!("Wrote residuals to {}", path.display());
    }
    if let Some(path) = &config.export_fit {
        let doc = build_fit_file(&run.fit, config.source, &run.spectrum.wave, &run.spectrum.values);
        write_fit_json(path, &doc)?;
        log::info!("Wrote fit to {}", path.display());
    }

    Ok(())
}

fn handle_basis(args: BasisArgs) -> Result<(), AppError> {
    // Reject an unknown source before touching the data directory.
    let source: PigmentSource = args.source.parse()?;
    let kind: PigmentKind = args.ctype.parse()?;
    let provider = CsvReferenceProvider::resolve(args.data.data_dir.as_deref())?;
    let wave = wavelength_grid(args.grid.wave_min, args.grid.wave_max, args.grid.step)?;
    let values = a_chl(&provider, &wave, &kind, source)?;

    let spectrum = Spectrum {
        errors: vec![f64::NAN; wave.len()],
        wave,
        values,
    };
    write_spectrum(std::io::stdout().lock(), &spectrum, kind.column_key())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    if args.coeffs.len() != 3 {
        return Err(AppError::input(format!(
            "--coeffs takes 3 values (Chl-a, Chl-b, Chl-c12), got {}.",
            args.coeffs.len()
        )));
    }
    let provider = CsvReferenceProvider::resolve(args.data.data_dir.as_deref())?;
    let wave = wavelength_grid(args.grid.wave_min, args.grid.wave_max, args.grid.step)?;
    let basis = chlorophyll_basis(&provider, &wave, args.source)?;
    let spec = SampleSpec {
        coefficients: args.coeffs.clone(),
        relative_noise: args.noise,
        seed: args.seed,
    };
    let spectrum = synthesize_spectrum(&wave, basis, &spec)?;
    write_spectrum_csv(&args.output, &spectrum, "a")
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit = read_fit_json(&args.fit)?;
    let plot = crate::plot::render_ascii_plot_from_fit_file(&fit, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn handle_tara(args: TaraArgs) -> Result<(), AppError> {
    let table = load_table(&args.table)?;

    if let Some(wv_cen) = args.single {
        let (value, sig) = crate::tara::single_value(&table, wv_cen, args.window, args.flavor)?;
        println!("row,value,sig");
        for (i, (v, s)) in value.iter().zip(sig.iter()).enumerate() {
            println!("{i},{v},{s}");
        }
        return Ok(());
    }

    let spectrum = match args.row {
        Some(row) => crate::tara::spectrum_from_row(&table, row, args.flavor, args.keep_nan)?,
        None => crate::tara::average_spectrum(&table, args.flavor)?,
    };
    if spectrum.is_empty() {
        return Err(AppError::NoData(format!(
            "No {} wavelengths in {}.",
            args.flavor.prefix(),
            args.table.display()
        )));
    }
    let spectrum = regrid(spectrum, &args)?;

    if args.plot {
        let plot = crate::plot::render_spectrum_plot(&spectrum.wave, &spectrum.values, 100, 25);
        eprintln!("{plot}");
    }
    write_spectrum(std::io::stdout().lock(), &spectrum, args.flavor.prefix())
}

/// Apply `--interp` / `--rebin` to a Tara spectrum.
fn regrid(spectrum: Spectrum, args: &TaraArgs) -> Result<Spectrum, AppError> {
    let (Some(w0), Some(w1)) = (spectrum.wave.first().copied(), spectrum.wave.last().copied()) else {
        return Ok(spectrum);
    };

    if let Some(step) = args.interp {
        let grid = wavelength_grid(w0, w1, step)?;
        let (values, errors) =
            crate::tara::interpolate_to_grid(&spectrum.wave, &spectrum.values, &spectrum.errors, &grid)?;
        return Ok(Spectrum { wave: grid, values, errors });
    }

    if let Some(step) = args.rebin {
        let edges = wavelength_grid(w0, w1 + step, step)?;
        let n = spectrum.len();
        let values = DMatrix::from_column_slice(n, 1, &spectrum.values);
        let errors = DMatrix::from_column_slice(n, 1, &spectrum.errors);
        let binned = crate::tara::rebin_to_grid(&spectrum.wave, &values, &errors, &edges)?;
        return Ok(Spectrum {
            wave: binned.wave,
            values: binned.values.row(0).iter().copied().collect(),
            errors: binned.errors.row(0).iter().copied().collect(),
        });
    }

    Ok(spectrum)
}

fn handle_pca(args: PcaArgs) -> Result<(), AppError> {
    let root = match &args.root {
        Some(root) => root.clone(),
        None => data_root_from_env()?,
    };
    let (pca_a, pca_b) =
        crate::remote::l23_hydrolight(&root, args.x, args.y, args.na, args.nb, args.output.as_deref())?;

    for (label, pca) in [("a", &pca_a), ("b", &pca_b)] {
        let ratios: Vec<String> = pca
            .explained_variance_ratio
            .iter()
            .map(|r| format!("{r:.4}"))
            .collect();
        println!("{label}: {} components, explained variance ratio [{}]", pca.n_components(), ratios.join(", "));
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        spectrum_path: args.spectrum.clone(),
        wave_column: args.wave_column.clone(),
        value_column: args.value_column.clone(),
        source: args.source,
        extras_path: args.extras.clone(),
        gaussian_bands: args.gaussian_bands,
        data_dir: args.data.data_dir.clone(),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_fit: args.export_fit.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn tara_args(extra: &[&str]) -> TaraArgs {
        let mut argv = vec!["oc", "tara", "t.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Tara(args) => args,
            _ => panic!("expected tara"),
        }
    }

    fn spectrum() -> Spectrum {
        Spectrum {
            wave: vec![400.0, 402.0, 404.0, 406.0],
            values: vec![1.0, 3.0, 5.0, 7.0],
            errors: vec![0.1; 4],
        }
    }

    #[test]
    fn fit_config_maps_flags() {
        let cli = Cli::try_parse_from(["oc", "fit", "obs.csv", "--no-plot", "--export-fit", "f.json"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        assert!(!config.plot);
        assert_eq!(config.export_fit.as_deref(), Some(Path::new("f.json")));
        assert_eq!(config.spectrum_path, Path::new("obs.csv"));
    }

    #[test]
    fn regrid_interpolates() {
        let out = regrid(spectrum(), &tara_args(&["--interp", "1"])).unwrap();
        assert_eq!(out.wave.len(), 7);
        assert_eq!(out.values[1], 2.0);
    }

    #[test]
    fn regrid_rebins() {
        let out = regrid(spectrum(), &tara_args(&["--rebin", "4"])).unwrap();
        assert_eq!(out.wave, vec![402.0, 406.0]);
        assert_eq!(out.values, vec![2.0, 6.0]);
    }

    #[test]
    fn regrid_passes_through_without_options() {
        assert_eq!(regrid(spectrum(), &tara_args(&[])).unwrap(), spectrum());
    }
}

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use lx_core::config::AnalysisConfig;
use lx_render::plot::TimeSeriesPlot;

pub mod cli;
pub mod pipeline;
pub mod viewer;

use pipeline::Analysis;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider la source
    cli.validate_source()?;

    // 4. Charger la config puis appliquer les overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);
    config.extractor.validate()?;

    // 5. Analyser
    let analyses = run_analyses(&cli, &config)?;
    if analyses.is_empty() {
        anyhow::bail!("Aucune entrée n'a pu être analysée.");
    }

    // 6. Export JSON
    if let Some(ref json) = cli.json {
        let multiple = analyses.len() > 1;
        for analysis in &analyses {
            let path = pipeline::json_target(json, &analysis.label, multiple);
            pipeline::export_json(&analysis.timeline, &path)?;
        }
    }

    for analysis in &analyses {
        print_summary(analysis);
    }

    if cli.no_plot {
        return Ok(());
    }

    // 7. Graphe : interactif dans un terminal, texte sinon
    if std::io::stdout().is_terminal() {
        let mut viewer = viewer::Viewer::new(analyses, &config.plot)?;
        let terminal = ratatui::init();
        let result = viewer.run(terminal);
        // Restaurer le terminal (TOUJOURS, même en cas d'erreur)
        ratatui::restore();
        result
    } else {
        for analysis in &analyses {
            let names = analysis.timeline.names();
            let plot = TimeSeriesPlot::from_timeline(
                &analysis.timeline,
                names.as_slice(),
                &format!("{} : {}", config.plot.title, analysis.label),
            )?;
            print!(
                "{}",
                plot.render_to_string(config.plot.width, config.plot.height)
            );
        }
        Ok(())
    }
}

/// Ton synthétique ou fichiers décodés en parallèle.
fn run_analyses(cli: &cli::Cli, config: &AnalysisConfig) -> Result<Vec<Analysis>> {
    if !cli.tone.is_empty() {
        let signal = pipeline::tone_signal(
            &cli.tone,
            cli.duration,
            cli.level,
            cli.ramp,
            config.extractor.sample_rate,
        )?;
        let timeline = pipeline::analyse(&signal, config)?;
        return Ok(vec![Analysis {
            label: pipeline::tone_label(&cli.tone),
            timeline,
        }]);
    }

    let mut analyses = Vec::with_capacity(cli.input.len());
    for (path, result) in cli
        .input
        .iter()
        .zip(pipeline::analyse_files(&cli.input, config))
    {
        match result {
            Ok(analysis) => analyses.push(analysis),
            Err(e) => log::error!("{} : {e:#}", path.display()),
        }
    }
    Ok(analyses)
}

fn print_summary(analysis: &Analysis) {
    let timeline = &analysis.timeline;
    println!(
        "{} : {} frames, hop {} @ {} Hz",
        analysis.label,
        timeline.frame_count(),
        timeline.hop_size,
        timeline.sample_rate
    );
    for name in timeline.names() {
        if let Ok(Some(stats)) = timeline.stats(&name) {
            println!(
                "  {name:<24} max {:>8.3} à {:>7.3} s, moyenne {:>8.3}",
                stats.max, stats.peak_time, stats.mean
            );
        }
    }
}

/// Config absente : valeurs par défaut.
fn resolve_config(cli: &cli::Cli) -> Result<AnalysisConfig> {
    if cli.config.exists() {
        lx_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AnalysisConfig::default())
    }
}

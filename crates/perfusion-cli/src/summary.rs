use std::path::Path;

use console::Style;
use perfusion_core::pipeline::{GroupReport, PipelineConfig};
use perfusion_core::register::{PairRegistration, RegistrationConfig};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    ok: Style,
    failed: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            ok: Style::new().green(),
            failed: Style::new().red(),
            path: Style::new().underlined(),
        }
    }
}

/// Result of one group as the run command saw it.
pub struct GroupOutcome {
    pub name: String,
    pub result: Result<GroupReport, String>,
}

fn rule(s: &Styles, width: usize) {
    println!("  {}", s.title.apply_to("\u{2550}".repeat(width)));
}

pub fn print_run_summary(config: &PipelineConfig, input: &Path, output: &Path, groups: usize) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Perfusion Pipeline"));
    rule(&s, 18);
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Groups"),
        s.value.apply_to(groups)
    );
    println!();

    println!("  {}", s.header.apply_to("Series"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Reference"),
        s.value.apply_to(format!("frame {}", config.series.reference_frame_index))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("On failure"),
        s.method.apply_to(config.series.failure_policy)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Fixed edges"),
        s.method.apply_to(config.series.fixed_edges)
    );
    println!();

    print_registration_section(&s, &config.registration);

    println!("  {}", s.header.apply_to("Time to Peak"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Colormap"),
        s.method.apply_to(format!(
            "{} ({} levels)",
            config.colorize.colormap, config.colorize.levels
        ))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Edges"),
        s.value.apply_to(config.colorize.edge_threshold)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Dilation"),
        s.value.apply_to(format!("{} px", config.colorize.dilation_radius))
    );
    println!();
}

fn print_registration_section(s: &Styles, config: &RegistrationConfig) {
    println!("  {}", s.header.apply_to("Registration"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Transform"),
        s.method.apply_to(config.family)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Iterations"),
        s.value.apply_to(config.max_iterations)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Step"),
        s.value.apply_to(format!("{} .. {}", config.max_step, config.min_step))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Edges"),
        s.value.apply_to(config.edge_threshold)
    );
    println!();
}

pub fn print_group_reports(outcomes: &[GroupOutcome], output: &Path) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Results"));
    rule(&s, 7);
    println!();

    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                println!(
                    "  {:<14}{} processed, {}",
                    s.label.apply_to(&outcome.name),
                    s.ok.apply_to(report.processed),
                    if report.failed == 0 {
                        s.ok.apply_to("0 failed".to_string())
                    } else {
                        s.failed.apply_to(format!("{} failed", report.failed))
                    }
                );
                for (frame, reason) in &report.failures {
                    println!(
                        "    {:<12}{}",
                        s.label.apply_to(format!("frame {}", frame.index + 1)),
                        s.failed.apply_to(reason)
                    );
                }
            }
            Err(reason) => {
                println!(
                    "  {:<14}{}",
                    s.label.apply_to(&outcome.name),
                    s.failed.apply_to(reason)
                );
            }
        }
    }
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Saved to"),
        s.path.apply_to(output.display())
    );
    println!();
}

pub fn print_registration_result(pair: &PairRegistration) {
    let s = Styles::new();
    let transform = pair.transform();
    let (dx, dy) = transform.translation();

    println!();
    println!("  {}", s.title.apply_to("Registration"));
    rule(&s, 12);
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Translation"),
        s.value.apply_to(format!("({dx:.2}, {dy:.2}) px"))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Rotation"),
        s.value.apply_to(format!("{:.3} deg", transform.rotation().to_degrees()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Scale"),
        s.value.apply_to(format!("{:.4}", transform.scale()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Edge Dice"),
        s.value.apply_to(format!(
            "{:.3} -> {:.3}",
            pair.coarse_dice, pair.fine_dice
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Refinement"),
        if pair.refinement_accepted {
            s.ok.apply_to("accepted")
        } else {
            s.failed.apply_to("rejected")
        }
    );
    println!();
}

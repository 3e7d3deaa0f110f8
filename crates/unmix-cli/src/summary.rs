use std::path::Path;

use console::Style;
use unmix_core::pipeline::DemuxOutput;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(image: &Path, output: &DemuxOutput) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Unmix Run"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Image"),
        s.path.apply_to(image.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Sidecar"),
        s.path.apply_to(output.sidecar_path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Channels"),
        s.value.apply_to(output.params.nch)
    );
    println!(
        "  {:<14}{} bins, {} cycles, mode {}",
        s.label.apply_to("Parameters"),
        s.value.apply_to(output.params.bins),
        s.value.apply_to(output.params.cycles),
        s.value.apply_to(&output.params.mode)
    );
    println!();

    println!("  {}", s.header.apply_to("Unmixing matrix"));
    for row in output.p_matrix.rows() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>8.4}")).collect();
        println!("    {}", cells.join(" "));
    }
    println!();

    println!("  {}", s.header.apply_to("Channel ranges (p2..p98)"));
    for (ch, [low, high]) in output.channel_ranges.iter().enumerate() {
        println!(
            "    {:<10}{:.2} .. {:.2}",
            s.label.apply_to(format!("ch {ch}")),
            low,
            high
        );
    }
    println!();
}

/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Export Configuration ===\n");

    println!("Export:");
    println!("  Backend: {:?}", config.export.backend);
    println!("  Format: {}", config.export.format);
    println!("  DPI Scale: {}", config.export.dpi_scale);
    println!("  Quality: {}", config.export.quality);
    println!();

    println!("PDF:");
    println!(
        "  Page: {} x {} in",
        config.pdf.page_width_in, config.pdf.page_height_in
    );
    println!("  Title: {:?}", config.pdf.title);
    println!("  Author: {:?}", config.pdf.author);
    println!();

    println!("Rendering:");
    println!("  Curve Samples: {}", config.rendering.curve_samples);
    println!("  Flatten Steps: {}", config.rendering.flatten_steps);
    println!("  Pattern Seed: {:?}", config.rendering.pattern_seed);
    println!();

    println!("Assets:");
    println!("  Root: {:?}", config.assets.root);
    println!("  Default Font: {:?}", config.assets.default_font);
}

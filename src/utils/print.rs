/// Formats a shape as `[1, 256, 48, 48]`
pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(", "))
}

/// One line per feature level: `  x: [..], pos: [..]`
pub fn describe_levels(features: &[&[usize]], positions: &[&[usize]]) -> String {
    let mut lines = vec![format!("xs: {}", features.len())];
    for (x, pos) in features.iter().zip(positions) {
        lines.push(format!("  x: {}, pos: {}", format_shape(x), format_shape(pos)));
    }
    lines.join("\n")
}

/// Titled block of named shapes, in the layout of the inspection scripts
pub fn describe_arrays(title: &str, arrays: &[(&str, &[usize])]) -> String {
    let mut lines = vec![format!("========== {} ==========", title)];
    for (name, shape) in arrays {
        lines.push(format!("{}: {}", name, format_shape(shape)));
    }
    lines.join("\n")
}

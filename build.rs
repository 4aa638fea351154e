use std::fs;

fn main() {
    // Validate bundled themes at compile time
    println!("cargo:rerun-if-changed=themes");
    for entry in fs::read_dir("themes").expect("Failed to read themes directory") {
        let path = entry.expect("Failed to read themes entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        println!("cargo:rerun-if-changed={}", path.display());

        let content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        let table = content
            .parse::<toml::Table>()
            .unwrap_or_else(|e| panic!("Invalid theme {}: {}", path.display(), e));

        // The registry looks themes up by name; it must match the file stem
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        match table.get("name").and_then(|n| n.as_str()) {
            Some(name) if name == stem => {}
            other => panic!(
                "Theme {} declares name {:?}, expected \"{}\"",
                path.display(),
                other,
                stem
            ),
        }
        for section in ["colors", "admonitions", "fonts"] {
            if !table.contains_key(section) {
                panic!("Theme {} is missing [{}]", path.display(), section);
            }
        }
        for section in ["colors", "admonitions"] {
            let Some(colors) = table.get(section).and_then(|s| s.as_table()) else {
                panic!("Theme {} has a non-table [{}]", path.display(), section);
            };
            for (key, value) in colors {
                if !value.as_str().is_some_and(is_hex_color) {
                    panic!(
                        "Theme {} has {}.{} = {}, expected \"#rrggbb\"",
                        path.display(),
                        section,
                        key,
                        value
                    );
                }
            }
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

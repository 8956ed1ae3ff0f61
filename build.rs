use std::fs;

const TABLES: [&str; 3] = ["inline", "links", "extract"];

fn main() {
    // Validate default config at compile time
    let config_path = "src/default_config.toml";
    println!("cargo:rerun-if-changed={}", config_path);

    let content = fs::read_to_string(config_path).expect("Failed to read default_config.toml");

    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {}", e),
    };

    for (key, value) in &table {
        if !TABLES.contains(&key.as_str()) {
            panic!("Unknown table [{}] in default_config.toml", key);
        }
        if !value.is_table() {
            panic!("`{}` in default_config.toml must be a table", key);
        }
    }

    let sections = table
        .get("extract")
        .and_then(|extract| extract.get("sections"))
        .and_then(|sections| sections.as_array());
    match sections {
        Some(titles) if titles.iter().all(|title| title.is_str()) => {}
        _ => panic!("default_config.toml needs [extract] sections as a list of strings"),
    }
}

use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Payload of a read command that located what it was asked for.
#[derive(Serialize)]
pub struct Found<T: Serialize> {
    pub found: bool,
    #[serde(flatten)]
    pub value: T,
}

pub fn print_found<T: Serialize>(value: T) -> anyhow::Result<()> {
    print_json(&Found { found: true, value })
}

/// Read commands report a missing target as data and still exit 0.
pub fn print_not_found(error: impl std::fmt::Display) -> anyhow::Result<()> {
    print_json(&serde_json::json!({
        "found": false,
        "error": error.to_string(),
    }))
}

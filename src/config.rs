use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to the gym schedule Postgres instance")?;
        let max_connections = match std::env::var("SCHEDULE_MAX_CONNECTIONS") {
            Ok(raw) => parse_max_connections(&raw)?,
            Err(_) => 5,
        };

        Ok(Config {
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(raw: &str) -> anyhow::Result<u32> {
    let value: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("SCHEDULE_MAX_CONNECTIONS is not a number: {raw:?}"))?;
    anyhow::ensure!(value > 0, "SCHEDULE_MAX_CONNECTIONS must be at least 1");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_must_be_positive_number() {
        assert_eq!(parse_max_connections(" 8 ").unwrap(), 8);
        assert!(parse_max_connections("0").is_err());
        assert!(parse_max_connections("many").is_err());
    }
}

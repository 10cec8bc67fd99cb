use std::fmt;

/// Flux query for the most recent record of one measurement, pivoted so every
/// field becomes its own column.
#[derive(Debug, Clone, Copy)]
pub struct LatestRecordQuery<'a> {
    pub bucket: &'a str,
    pub measurement: &'a str,
    pub range_minutes: u64,
}

impl fmt::Display for LatestRecordQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "from(bucket:{})", flux_string(self.bucket))?;
        writeln!(f, "  |> range(start: -{}m)", self.range_minutes)?;
        writeln!(
            f,
            "  |> filter(fn: (r) => r._measurement == {})",
            flux_string(self.measurement)
        )?;
        writeln!(f, "  |> last()")?;
        write!(
            f,
            "  |> pivot(rowKey:[\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")"
        )
    }
}

fn flux_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

use polars::prelude::{DataType, TimeUnit};

/// Renders a polars dtype with the pandas-style names that override files are
/// written against (`int64`, `float64`, `object`, `datetime64[ns]`, ...).
/// Dtypes without a pandas counterpart fall back to polars' own name.
pub fn dtype_label(dtype: &DataType) -> String {
    match dtype {
        DataType::Boolean => "bool".to_string(),
        DataType::Int32 => "int32".to_string(),
        DataType::Int64 => "int64".to_string(),
        DataType::UInt32 => "uint32".to_string(),
        DataType::UInt64 => "uint64".to_string(),
        DataType::Float32 => "float32".to_string(),
        DataType::Float64 => "float64".to_string(),
        DataType::String => "object".to_string(),
        // A column with no values at all reads as float64 in pandas.
        DataType::Null => "float64".to_string(),
        DataType::Date => "datetime64[ns]".to_string(),
        DataType::Datetime(_, None) => "datetime64[ns]".to_string(),
        DataType::Datetime(_, Some(tz)) => format!("datetime64[ns, {tz}]"),
        DataType::Duration(unit) => format!("timedelta64[{}]", unit_suffix(unit)),
        other => other.to_string(),
    }
}

fn unit_suffix(unit: &TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Nanoseconds => "ns",
        TimeUnit::Microseconds => "us",
        TimeUnit::Milliseconds => "ms",
    }
}

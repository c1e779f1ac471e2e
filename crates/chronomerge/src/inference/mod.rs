//! Heuristics for dates, numbers, column roles and table layout.

mod dates;
mod long_format;
mod roles;
mod values;

pub use dates::{
    DateFormat, LOOSE_DATE_FORMATS, LOOSE_DATETIME_FORMATS, is_valid_date_string,
    normalize_to_iso_date, parse_date_string, parse_date_string_with_format, parse_date_value,
    parse_lenient_date_string, to_iso_key,
};
pub use long_format::{LongFormatDetector, LongFormatReport};
pub use roles::{
    NameRoles, default_columns, detect_date_columns, detect_numeric_columns, is_date_hint_name,
    rank_name_roles,
};
pub use values::{cell_text, is_empty_cell, parse_float, strict_number};

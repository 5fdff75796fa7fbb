//! Built-in document template.
//!
//! Callers can override it via [`crate::config::BatchConfigBuilder::template`]
//! or [`crate::config::BatchConfigBuilder::template_file`]; the constant here
//! is used only when no override is provided.

/// Default boarding-pass template.
///
/// Uses every record placeholder plus `{{generated_at}}`. The `@media print`
/// block is what engines rendering with [`crate::pipeline::render::MediaProfile::Print`]
/// apply.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Boarding Pass {{flight_number}} {{seat}}</title>
<style>
  body { font-family: Helvetica, Arial, sans-serif; margin: 0; }
  .pass { border: 2px solid #1a3a6b; border-radius: 8px; padding: 16px; width: 640px; }
  .row { display: flex; justify-content: space-between; margin-bottom: 8px; }
  .label { font-size: 10px; color: #666; text-transform: uppercase; }
  .value { font-size: 16px; font-weight: bold; }
  .barcode { font-family: monospace; letter-spacing: 2px; margin-top: 12px; }
  @media print {
    body { -webkit-print-color-adjust: exact; }
    .pass { page-break-inside: avoid; }
  }
</style>
</head>
<body>
<div class="pass">
<h1>BOARDING PASS</h1>
<div class="row">
<div><div class="label">Passenger</div><div class="value">{{passenger_name}}</div></div>
<div><div class="label">Flight</div><div class="value">{{flight_number}}</div></div>
</div>
<div class="row">
<div><div class="label">From</div><div class="value">{{origin}}</div></div>
<div><div class="label">To</div><div class="value">{{destination}}</div></div>
</div>
<div class="row">
<div><div class="label">Date</div><div class="value">{{date}}</div></div>
<div><div class="label">Departure</div><div class="value">{{time}}</div></div>
</div>
<div class="row">
<div><div class="label">Class</div><div class="value">{{cabin_class}}</div></div>
<div><div class="label">Seat</div><div class="value">{{seat}}</div></div>
</div>
<div class="barcode">{{barcode}}</div>
<p class="label">Generated {{generated_at}}</p>
</div>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::template::{unknown_placeholders, GENERATED_AT_KEY};
    use crate::record::FIELD_NAMES;

    #[test]
    fn default_template_uses_every_field() {
        for key in FIELD_NAMES.iter().chain(std::iter::once(&GENERATED_AT_KEY)) {
            let token = format!("{{{{{key}}}}}");
            assert!(
                DEFAULT_TEMPLATE.contains(&token),
                "default template is missing {token}"
            );
        }
    }

    #[test]
    fn default_template_has_no_unknown_placeholders() {
        assert!(unknown_placeholders(DEFAULT_TEMPLATE).is_empty());
    }

    #[test]
    fn default_template_has_print_rules() {
        assert!(DEFAULT_TEMPLATE.contains("@media print"));
    }
}

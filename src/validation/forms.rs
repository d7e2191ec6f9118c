use garde::Validate;

use crate::error::{AppError, FieldErrors, Result};

/// Runs the draft's checks and flattens any failure into the same
/// field-keyed map the backend answers with (`idNumber`, not `id_number`).
///
/// # Arguments
///
/// * `draft` - The form payload about to be sent.
///
/// # Returns
///
/// `Ok(())` when the draft may be sent, `AppError::Validation` otherwise.
pub fn check<T>(draft: &T) -> Result<()>
where
    T: Validate<Context = ()>,
{
    match draft.validate() {
        Ok(()) => Ok(()),
        Err(report) => {
            let mut errors = FieldErrors::new();
            for (path, error) in report.iter() {
                errors
                    .entry(camel_case(&path.to_string()))
                    .or_insert_with(|| error.message().to_string());
            }
            Err(AppError::Validation(errors))
        }
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

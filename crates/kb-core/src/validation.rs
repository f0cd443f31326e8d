//! Local form validation. Failures here never reach the network.

use validator::Validate;

use crate::error::KbResult;

/// Run `validator` rules and map failures to `KbError::Validation`.
pub fn ensure_valid<T: Validate>(value: &T) -> KbResult<()> {
    value.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;
    use crate::models::RecordForm;

    #[test]
    fn blank_name_is_invalid() {
        let form = RecordForm::default();
        assert!(matches!(ensure_valid(&form), Err(KbError::Validation(_))));

        let form = RecordForm {
            name: "ok".into(),
            ..Default::default()
        };
        assert!(ensure_valid(&form).is_ok());
    }
}

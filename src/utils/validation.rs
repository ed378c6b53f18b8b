use crate::error::{AppError, Result};

/// 非空文本校验（只有空白也视为空）
///
/// `validator` 的 `length` 规则不会把纯空白当作空值，提交前用它补充检查。
pub fn require_text(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("respuesta", "vacío").is_ok());
        assert!(require_text("", "vacío").is_err());
        assert!(require_text("   \n", "vacío").is_err());
    }
}

//! Client error type and the administrative error-message table.
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Error de conexión. Verifique su internet.";
pub const SERVER_ERROR_MESSAGE: &str = "Error del servidor";
pub const GENERIC_ADMIN_ERROR: &str = "Error desconocido en la operación administrativa";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The request never got an answer.
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network { detail: String },
    #[error("Respuesta inválida del servidor: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Build an HTTP error from a status and the raw response body. The
    /// message is the first of `detail`, `error`, `message` in a JSON body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                ["detail", "error", "message"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_owned))
            })
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string());
        ApiError::Http { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: SERVER_ERROR_MESSAGE.to_string(),
            }
        } else {
            ApiError::Network {
                detail: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Operation names used to pick an error message. Bulk operations share the
/// name of their single-course counterpart where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminOperation {
    Load,
    Create,
    Update,
    Activate,
    Deactivate,
    Delete,
    Transfer,
    Duplicate,
    CopyContent,
    ChangeState,
    UpdateCategory,
    UpdateLevel,
    UpdateModality,
    SetPrice,
    SetCapacity,
}

impl AdminOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminOperation::Load => "load",
            AdminOperation::Create => "create",
            AdminOperation::Update => "update",
            AdminOperation::Activate => "activate",
            AdminOperation::Deactivate => "deactivate",
            AdminOperation::Delete => "delete",
            AdminOperation::Transfer => "transfer",
            AdminOperation::Duplicate => "duplicate",
            AdminOperation::CopyContent => "copy_content",
            AdminOperation::ChangeState => "change_state",
            AdminOperation::UpdateCategory => "update_category",
            AdminOperation::UpdateLevel => "update_level",
            AdminOperation::UpdateModality => "update_modality",
            AdminOperation::SetPrice => "set_price",
            AdminOperation::SetCapacity => "set_capacity",
        }
    }
}

impl fmt::Display for AdminOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static ADMIN_ERRORS: Lazy<HashMap<(u16, AdminOperation), &'static str>> = Lazy::new(|| {
    use AdminOperation::*;
    let mut m = HashMap::new();

    m.insert((400, Activate), "El curso no cumple los requisitos para ser activado");
    m.insert((403, Activate), "No tienes permisos para activar cursos");
    m.insert((404, Activate), "El curso que intentas activar no existe");
    m.insert((409, Activate), "El curso ya se encuentra activo");

    m.insert((400, Deactivate), "No se puede desactivar el curso en su estado actual");
    m.insert((403, Deactivate), "No tienes permisos para desactivar cursos");
    m.insert((404, Deactivate), "El curso que intentas desactivar no existe");
    m.insert((409, Deactivate), "El curso ya se encuentra inactivo");

    m.insert((400, Delete), "No se puede eliminar un curso con estudiantes inscritos activos");
    m.insert((403, Delete), "No tienes permisos para eliminar cursos");
    m.insert((404, Delete), "El curso que intentas eliminar no existe");
    m.insert((409, Delete), "El curso tiene dependencias que impiden su eliminación");

    m.insert((400, Transfer), "El instructor seleccionado no es válido para la transferencia");
    m.insert((403, Transfer), "No tienes permisos para transferir cursos");
    m.insert((404, Transfer), "El curso o el instructor no existen");

    m.insert((400, Create), "Los datos del curso no son válidos");
    m.insert((403, Create), "No tienes permisos para crear cursos");
    m.insert((409, Create), "Ya existe un curso con ese título");

    m.insert((400, Update), "Los datos actualizados del curso no son válidos");
    m.insert((403, Update), "No tienes permisos para editar cursos");
    m.insert((404, Update), "El curso que intentas editar no existe");

    m.insert((400, Duplicate), "No se pudo duplicar el curso con los datos indicados");
    m.insert((403, Duplicate), "No tienes permisos para duplicar cursos");
    m.insert((404, Duplicate), "El curso original no existe");

    m.insert((400, CopyContent), "No se pudo copiar el contenido del curso original");
    m.insert((404, CopyContent), "El curso original o la copia no existen");

    m.insert((400, ChangeState), "El servidor no permite esta transición de estado");
    m.insert((403, ChangeState), "No tienes permisos para cambiar el estado del curso");
    m.insert((404, ChangeState), "El curso que intentas modificar no existe");

    for op in [UpdateCategory, UpdateLevel, UpdateModality, SetPrice, SetCapacity] {
        m.insert((400, op), "Algunos cursos seleccionados no admiten esta operación");
        m.insert((403, op), "No tienes permisos para realizar operaciones masivas");
        m.insert((404, op), "Uno o más cursos seleccionados no existen");
    }

    m.insert((401, Load), "Tu sesión ha expirado. Inicia sesión nuevamente.");
    m.insert((403, Load), "Se requieren permisos de administrador");

    m
});

/// Map an error raised by `op` to the message shown to the administrator.
/// Pure in `(err.status(), op)`; pairs missing from the table fall back to
/// the error's own message.
pub fn handle_admin_error(err: &ApiError, op: AdminOperation) -> String {
    if let Some(status) = err.status() {
        if let Some(msg) = ADMIN_ERRORS.get(&(status, op)) {
            return (*msg).to_string();
        }
    }
    let message = err.message();
    if message.trim().is_empty() {
        GENERIC_ADMIN_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> ApiError {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    #[test]
    fn mapped_pairs_return_fixed_strings() {
        assert_eq!(
            handle_admin_error(&http(400, "raw"), AdminOperation::Delete),
            "No se puede eliminar un curso con estudiantes inscritos activos"
        );
        assert_eq!(
            handle_admin_error(&http(403, "raw"), AdminOperation::SetPrice),
            "No tienes permisos para realizar operaciones masivas"
        );
    }

    #[test]
    fn every_table_entry_ignores_the_raw_message() {
        for ((status, op), expected) in ADMIN_ERRORS.iter() {
            let a = handle_admin_error(&http(*status, "uno"), *op);
            let b = handle_admin_error(&http(*status, "dos"), *op);
            assert_eq!(a, *expected);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn unmapped_pairs_return_message_unchanged() {
        assert_eq!(
            handle_admin_error(&http(500, "boom interno"), AdminOperation::Activate),
            "boom interno"
        );
        assert_eq!(
            handle_admin_error(&http(409, "ya existe"), AdminOperation::Transfer),
            "ya existe"
        );
        let net = ApiError::Network {
            detail: "connection refused".into(),
        };
        assert_eq!(
            handle_admin_error(&net, AdminOperation::Delete),
            NETWORK_ERROR_MESSAGE
        );
    }

    #[test]
    fn empty_message_uses_generic_text() {
        assert_eq!(
            handle_admin_error(&ApiError::Other(String::new()), AdminOperation::Update),
            GENERIC_ADMIN_ERROR
        );
    }

    #[test]
    fn from_response_picks_first_known_key() {
        let err = ApiError::from_response(400, r#"{"error": "malo", "message": "otro"}"#);
        assert_eq!(err, http(400, "malo"));
        let err = ApiError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err, http(502, SERVER_ERROR_MESSAGE));
        let err = ApiError::from_response(404, r#"{"detail": "No encontrado."}"#);
        assert_eq!(err.message(), "No encontrado.");
    }
}

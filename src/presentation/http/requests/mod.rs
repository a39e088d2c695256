use poem_openapi::{Multipart, Object, types::multipart::Upload};

#[derive(Object, Debug)]
pub struct LoginRequestDto {
    pub email: String,
    pub password: String,
}

#[derive(Object, Debug)]
pub struct CreateUserRequestDto {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Object, Debug, Default)]
pub struct UpdateUserRequestDto {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Object, Debug)]
pub struct AddCreditsRequestDto {
    pub amount: i64,
    pub description: Option<String>,
    /// RFC 3339 timestamp after which the balance can no longer be spent.
    pub valid_till: Option<String>,
}

#[derive(Object, Debug)]
pub struct SaveTimezoneRequestDto {
    pub timezone: String,
}

#[derive(Object, Debug)]
pub struct VerifySingleRequestDto {
    pub email: String,
}

#[derive(Object, Debug)]
pub struct JobRequestDto {
    pub job_id: String,
}

#[derive(Multipart, Debug)]
pub struct UploadListForm {
    pub file: Upload,
}

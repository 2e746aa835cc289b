use crate::domain::{LoginFailed, LoginRequest, LoginResponse};

/// Grounded on `example/user/service.UserService.Login`: the only
/// account this toy backend accepts is `"test"`.
pub fn login(instance: &str, req: &LoginRequest) -> LoginResponse {
    if req.account != "test" {
        return LoginResponse {
            token: String::new(),
            failed: Some(LoginFailed(format!(
                "{instance}: account is wrong"
            ))),
        };
    }
    LoginResponse {
        token: format!("token-from-{instance}"),
        failed: None,
    }
}

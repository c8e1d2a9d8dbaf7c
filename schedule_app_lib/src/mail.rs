use anyhow::{Error, format_err};
use log::error;
use sparkpost::transmission::{
    EmailAddress, Message, Recipient, Transmission, TransmissionResponse,
};
use stack_string::format_sstr;

use crate::config::Config;

/// Sends the password reset code. Blocking, run it inside `spawn_blocking`
/// from async context.
///
/// # Errors
/// Returns error if mail is not configured or the transmission fails
pub fn send_reset_code(config: &Config, recipient_email: &str, code: &str) -> Result<(), Error> {
    let api_key = config
        .sparkpost_api_key
        .as_ref()
        .ok_or_else(|| format_err!("No sparkpost api key configured"))?;
    let sending_address = config
        .sending_email_address
        .as_ref()
        .ok_or_else(|| format_err!("No sending email address configured"))?;

    let tm = Transmission::new(api_key.as_str());
    let mut email = Message::new(EmailAddress::new(
        sending_address.to_string(),
        config.app_name.to_string(),
    ));
    let recipient: Recipient = recipient_email.into();
    let subject = "Your Password Reset Code".to_string();
    let body = format_sstr!(
        "Hi,<br><br>\
         Here is your password reset code:<br><br>\
         <span style=\"font-size: x-large; font-weight: bold;\">{code}</span><br><br>\
         This code will expire in 15 minutes.<br><br>\
         &mdash; {} Team",
        config.app_name
    );
    email
        .add_recipient(recipient)
        .subject(subject)
        .html(body.to_string());

    match tm.send(&email) {
        Ok(TransmissionResponse::ApiResponse(_)) => Ok(()),
        Ok(TransmissionResponse::ApiError(errors)) => {
            error!("email send failed: {errors:?}");
            Err(format_err!("email send failed"))
        }
        Err(e) => {
            error!("email send failed: {e:?}");
            Err(e.into())
        }
    }
}

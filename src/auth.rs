// src/auth.rs
//! OTP login flow. A subscriber record is created on the first login
//! attempt; verification trades the one-shot code for a UUID access token.
//! Kept deliberately thin — the pipeline only cares that tokens resolve.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::error::Result;
use crate::model::Subscriber;
use crate::notify::DynMailer;
use crate::store::SubscriberStore;

pub struct Auth {
    subscribers: Arc<SubscriberStore>,
    mailer: DynMailer,
}

impl Auth {
    pub fn new(subscribers: Arc<SubscriberStore>, mailer: DynMailer) -> Self {
        Self { subscribers, mailer }
    }

    /// Generate a 6-digit OTP, create or update the subscriber, persist,
    /// then mail the code. Returns whether the mail went out.
    pub async fn trigger_login(&self, email: &str) -> Result<bool> {
        let otp = format!("{:06}", rand::rng().random_range(0..1_000_000u32));

        let otp_for_store = otp.clone();
        let email_owned = email.to_string();
        self.subscribers
            .mutate(move |subs| {
                match subs.iter_mut().find(|s| s.email == email_owned) {
                    Some(sub) => sub.otp = Some(otp_for_store),
                    None => {
                        let mut sub = Subscriber::new(email_owned);
                        sub.otp = Some(otp_for_store);
                        subs.push(sub);
                    }
                }
                true
            })
            .await?;

        let body = format!("Your login code is {otp}. It is valid for one login.");
        match self.mailer.send(email, "Your login code", &body).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!(email, error = %e, "failed to send OTP mail");
                Ok(false)
            }
        }
    }

    /// Verify the code; on a match issue a fresh token, clear the OTP to
    /// prevent replay, and stamp last_online. Mismatch or unknown email
    /// yields None.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<Option<String>> {
        let token = uuid::Uuid::new_v4().to_string();
        let issued = token.clone();
        let email_owned = email.to_string();
        let code_owned = code.trim().to_string();

        let changed = self
            .subscribers
            .mutate(move |subs| {
                let Some(sub) = subs.iter_mut().find(|s| s.email == email_owned) else {
                    return false;
                };
                let matches = sub
                    .otp
                    .as_deref()
                    .is_some_and(|stored| !stored.is_empty() && stored == code_owned);
                if !matches {
                    return false;
                }
                sub.token = Some(issued);
                sub.otp = None;
                sub.last_online = Some(Utc::now());
                true
            })
            .await?;

        Ok(changed.then_some(token))
    }
}

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Context, RunOptions, Scenario, UserPool};
use crate::client::{ApiRequest, Credentials};
use crate::config::Config;
use crate::thresholds::Threshold;

const THINK_TIME: Duration = Duration::from_millis(200);
/// Tokens must be strictly longer than this to count as valid.
const MIN_TOKEN_LEN: usize = 10;

pub const CHECK_REGISTER: &str = "register status 200/409";
pub const CHECK_LOGIN: &str = "login ok (or overload)";
pub const CHECK_LOGIN_TOKEN: &str = "login returns refresh_token";
pub const CHECK_REFRESH: &str = "refresh ok or refuses cleanly";
pub const CHECK_REFRESH_TOKEN: &str = "refresh returns new token";
pub const CHECK_LOGOUT: &str = "logout ok or refuses cleanly";

/// Created, or already there from an earlier run with the same id.
pub fn register_accepted(status: u16) -> bool {
    matches!(status, 200 | 409)
}

/// 408 and 503 are clean refusals under overload, accepted only when asked for.
pub fn login_accepted(status: u16, allow_overload: bool) -> bool {
    if allow_overload {
        matches!(status, 200 | 408 | 503)
    } else {
        status == 200
    }
}

pub fn refresh_accepted(status: u16) -> bool {
    matches!(status, 200 | 408 | 503)
}

pub fn logout_accepted(status: u16) -> bool {
    matches!(status, 200 | 204 | 408 | 503)
}

pub fn is_valid_token(token: Option<&str>) -> bool {
    token.is_some_and(|t| t.chars().count() > MIN_TOKEN_LEN)
}

/// Where a single login → refresh → logout pass stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    LoginRejected { status: u16 },
    MissingRefreshToken,
    RefreshRefused { status: u16 },
    /// Refresh answered 200 with a body that is not JSON.
    UnreadableRefresh,
    LoggedOut { status: u16 },
}

/// Seeds a pool of accounts once, then has every virtual user cycle
/// through login, refresh and logout on its assigned account.
#[derive(Debug, Clone)]
pub struct AuthCycle {
    pub vus: usize,
    pub duration: Duration,
    pub password: String,
    pub seed_users: usize,
    pub skip_register: bool,
    pub allow_overload: bool,
    pub run_id: String,
}

impl From<&Config> for AuthCycle {
    fn from(cfg: &Config) -> Self {
        Self {
            vus: cfg.vus,
            duration: cfg.duration,
            password: cfg.test_password.clone(),
            seed_users: cfg.seed_users,
            skip_register: cfg.skip_register,
            allow_overload: cfg.allow_overload,
            run_id: cfg.run_id.clone(),
        }
    }
}

impl AuthCycle {
    fn credentials(&self, email: &str) -> Credentials {
        Credentials::new(email, self.password.as_str())
    }

    /// One pass against `email`, without the trailing think time.
    pub async fn cycle(&self, ctx: &Context, email: &str) -> CycleOutcome {
        let login = ctx
            .send(ApiRequest::Login(self.credentials(email)))
            .await;
        ctx.check(CHECK_LOGIN, login_accepted(login.status, self.allow_overload));
        if login.status != 200 {
            debug!(vu = ctx.vu(), status = login.status, "login not accepted");
            return CycleOutcome::LoginRejected {
                status: login.status,
            };
        }

        let Some(refresh_token) = login
            .json_str("/tokens/refresh_token")
            .filter(|t| !t.is_empty())
        else {
            ctx.check(CHECK_LOGIN_TOKEN, false);
            return CycleOutcome::MissingRefreshToken;
        };
        // A short token is flagged but still exercised.
        ctx.check(CHECK_LOGIN_TOKEN, is_valid_token(Some(&refresh_token)));

        let refresh = ctx.send(ApiRequest::Refresh { refresh_token }).await;
        ctx.check(CHECK_REFRESH, refresh_accepted(refresh.status));
        if refresh.status != 200 {
            debug!(vu = ctx.vu(), status = refresh.status, "refresh refused");
            return CycleOutcome::RefreshRefused {
                status: refresh.status,
            };
        }

        let Some(body) = refresh.json() else {
            debug!(vu = ctx.vu(), "refresh body is not JSON");
            return CycleOutcome::UnreadableRefresh;
        };
        // Unlike login, refresh returns the token pair at the top level.
        let rotated = body
            .pointer("/refresh_token")
            .and_then(|t| t.as_str())
            .map(str::to_owned);
        ctx.check(CHECK_REFRESH_TOKEN, is_valid_token(rotated.as_deref()));

        let logout = ctx
            .send(ApiRequest::Logout {
                refresh_token: rotated,
            })
            .await;
        ctx.check(CHECK_LOGOUT, logout_accepted(logout.status));

        CycleOutcome::LoggedOut {
            status: logout.status,
        }
    }
}

#[async_trait]
impl Scenario for AuthCycle {
    type Data = UserPool;

    fn name(&self) -> &'static str {
        "auth-cycle"
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            vus: self.vus,
            duration: self.duration,
            thresholds: vec![
                Threshold::FailedRateBelow(0.05),
                Threshold::DurationPercentileBelow {
                    percentile: 95.0,
                    limit_ms: 1500.0,
                },
            ],
        }
    }

    /// One register call per pooled account, in order. A rejected
    /// registration is counted and logged but never aborts setup.
    async fn setup(&self, ctx: &Context) -> Result<UserPool> {
        let pool = UserPool::generate(&self.run_id, self.seed_users);
        if pool.is_empty() {
            anyhow::bail!("user pool is empty, SEED_USERS must be at least 1");
        }

        if self.skip_register {
            info!(users = pool.len(), run_id = %self.run_id, "skipping registration");
            return Ok(pool);
        }

        info!(users = pool.len(), run_id = %self.run_id, "registering user pool");
        let mut rejected = 0usize;
        for email in pool.emails() {
            let resp = ctx
                .send(ApiRequest::Register(self.credentials(email)))
                .await;
            if !ctx.check(CHECK_REGISTER, register_accepted(resp.status)) {
                rejected += 1;
                warn!(%email, status = resp.status, "registration rejected");
            }
        }
        info!(users = pool.len(), rejected, "user pool ready");

        Ok(pool)
    }

    async fn iteration(&self, ctx: &Context, pool: &UserPool) {
        if let Some(email) = pool.for_vu(ctx.vu()) {
            self.cycle(ctx, email).await;
        }
        tokio::time::sleep(THINK_TIME).await;
    }
}

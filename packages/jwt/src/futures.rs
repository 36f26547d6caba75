//! Concrete futures for the asynchronous token operations
//!
//! The work runs on a spawned tokio task and reports back over a oneshot
//! channel; a dropped sender resolves to [`JwtError::TaskJoinError`].

use crate::error::{JwtError, JwtResult};
use crate::token::VerifiedToken;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;

/// Future resolving to a compact JWE
pub struct TokenGenerationFuture {
    rx: oneshot::Receiver<JwtResult<String>>,
}

impl TokenGenerationFuture {
    pub(crate) fn new(rx: oneshot::Receiver<JwtResult<String>>) -> Self {
        Self { rx }
    }
}

impl Future for TokenGenerationFuture {
    type Output = JwtResult<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(JwtError::TaskJoinError)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future resolving to the outcome of [`ParsedToken::verify_async`]
///
/// [`ParsedToken::verify_async`]: crate::ParsedToken::verify_async
pub struct TokenVerificationFuture {
    rx: oneshot::Receiver<JwtResult<VerifiedToken>>,
}

impl TokenVerificationFuture {
    pub(crate) fn new(rx: oneshot::Receiver<JwtResult<VerifiedToken>>) -> Self {
        Self { rx }
    }
}

impl Future for TokenVerificationFuture {
    type Output = JwtResult<VerifiedToken>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(JwtError::TaskJoinError)),
            Poll::Pending => Poll::Pending,
        }
    }
}

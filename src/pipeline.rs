//! Plugs and their composition.
//!
//! A plug takes a connection by value and returns it, possibly with a response sent. A
//! [`Pipeline`] runs plugs in order and stops after the first plug that halts the connection.
//!
//! ```
//! use http::{Method, StatusCode};
//! use plume::{
//!     conn::{Conn, ConnError},
//!     pipeline::{Pipeline, from_fn},
//!     testing::{self, TestAdapter},
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = Pipeline::new()
//!     .plug(from_fn(|mut conn: Conn<TestAdapter>| async move {
//!         conn.put_resp_header("x-plug", "1")?;
//!         Ok::<_, ConnError>(conn)
//!     }))
//!     .plug(from_fn(|mut conn: Conn<TestAdapter>| async move {
//!         conn.send_resp(StatusCode::OK, "hello").await?;
//!         conn.halt();
//!         Ok::<_, ConnError>(conn)
//!     }));
//!
//! let conn = testing::conn(Method::GET, "/".parse().unwrap(), "");
//! let conn = pipeline.run(conn).await.unwrap();
//! assert_eq!(conn.adapter().sent().unwrap().body, "hello");
//! # }
//! ```
use std::{fmt, future::Future, pin::Pin};

use crate::{
    adapter::Adapter,
    conn::{Conn, ConnError},
    log,
};

/// Future returned by boxed plugs.
pub type BoxFuture<A> = Pin<Box<dyn Future<Output = Result<Conn<A>, ConnError>> + Send>>;

// ===== Plug =====

/// A step of request handling.
pub trait Plug<A> {
    type Future: Future<Output = Result<Conn<A>, ConnError>> + Send;

    fn call(&self, conn: Conn<A>) -> Self::Future;
}

// ===== FromFn =====

/// Create a [`Plug`] from an async function.
pub fn from_fn<F>(f: F) -> FromFn<F> {
    FromFn { f }
}

/// A [`Plug`] created by [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

impl<A, F, Fut> Plug<A> for FromFn<F>
where
    F: Fn(Conn<A>) -> Fut,
    Fut: Future<Output = Result<Conn<A>, ConnError>> + Send,
{
    type Future = Fut;

    fn call(&self, conn: Conn<A>) -> Self::Future {
        (self.f)(conn)
    }
}

// ===== Pipeline =====

trait ErasedPlug<A>: Send + Sync {
    fn call_boxed(&self, conn: Conn<A>) -> BoxFuture<A>;
}

impl<A, P> ErasedPlug<A> for P
where
    P: Plug<A> + Send + Sync,
    P::Future: 'static,
{
    fn call_boxed(&self, conn: Conn<A>) -> BoxFuture<A> {
        Box::pin(self.call(conn))
    }
}

/// An ordered list of plugs.
pub struct Pipeline<A> {
    plugs: Vec<Box<dyn ErasedPlug<A>>>,
}

impl<A: Adapter> Pipeline<A> {
    /// Create new empty [`Pipeline`].
    pub fn new() -> Self {
        Self { plugs: Vec::new() }
    }

    /// Append a plug.
    pub fn plug<P>(mut self, plug: P) -> Self
    where
        P: Plug<A> + Send + Sync + 'static,
        P::Future: 'static,
    {
        self.plugs.push(Box::new(plug));
        self
    }

    /// Returns the number of plugs.
    pub fn len(&self) -> usize {
        self.plugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugs.is_empty()
    }

    /// Run every plug in order, stopping once the connection is halted.
    pub async fn run(&self, mut conn: Conn<A>) -> Result<Conn<A>, ConnError> {
        for (i, plug) in self.plugs.iter().enumerate() {
            if conn.is_halted() {
                log::debug!("pipeline halted before plug {i}");
                break;
            }
            conn = plug.call_boxed(conn).await?;
        }
        Ok(conn)
    }
}

impl<A: Adapter> Default for Pipeline<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Pipeline<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugs", &self.plugs.len())
            .finish()
    }
}

impl<A: Adapter> Plug<A> for std::sync::Arc<Pipeline<A>> {
    type Future = BoxFuture<A>;

    fn call(&self, conn: Conn<A>) -> Self::Future {
        let pipeline = self.clone();
        Box::pin(async move { pipeline.run(conn).await })
    }
}

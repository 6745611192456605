use ansi_term::{ANSIGenericString, Color};
use std::borrow::Cow;

/// Small terminal-coloring helpers for interpolating identifiers (executor ids, pod names)
/// into human-readable log lines (spec §2.8). `log`/`env_logger` render these as plain ANSI
/// escapes; non-terminal sinks see them as harmless escape codes, same as any `env_logger`
/// consumer.
pub fn cyan<'a, I, S: 'a + ToOwned + ?Sized>(input: I) -> ANSIGenericString<'a, S>
where
    I: Into<Cow<'a, S>>,
    <S as ToOwned>::Owned: std::fmt::Debug,
{
    Color::Cyan.paint(input)
}

pub fn red<'a, I, S: 'a + ToOwned + ?Sized>(input: I) -> ANSIGenericString<'a, S>
where
    I: Into<Cow<'a, S>>,
    <S as ToOwned>::Owned: std::fmt::Debug,
{
    Color::Red.paint(input)
}

pub fn green<'a, I, S: 'a + ToOwned + ?Sized>(input: I) -> ANSIGenericString<'a, S>
where
    I: Into<Cow<'a, S>>,
    <S as ToOwned>::Owned: std::fmt::Debug,
{
    Color::Green.paint(input)
}

/*
 * Copyright 2026 Telecare Contributors
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Framework-agnostic callback type.
//!
//! The session core notifies its host (Yew, Dioxus, a JS bridge, a test
//! harness) through these callbacks instead of depending on any UI
//! framework's own callback machinery.

use std::fmt;
use std::rc::Rc;

/// Cloneable wrapper around an `Fn(IN) -> OUT` closure.
pub struct Callback<IN, OUT = ()> {
    cb: Rc<dyn Fn(IN) -> OUT>,
}

impl<IN, OUT, F: Fn(IN) -> OUT + 'static> From<F> for Callback<IN, OUT> {
    fn from(func: F) -> Self {
        Callback { cb: Rc::new(func) }
    }
}

impl<IN, OUT> Clone for Callback<IN, OUT> {
    fn clone(&self) -> Self {
        Self {
            cb: self.cb.clone(),
        }
    }
}

impl<IN, OUT> fmt::Debug for Callback<IN, OUT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback<_>")
    }
}

impl<IN, OUT> Callback<IN, OUT> {
    /// Invoke the wrapped closure.
    pub fn emit(&self, value: IN) -> OUT {
        (*self.cb)(value)
    }
}

impl<IN> Callback<IN> {
    /// A callback that discards its input, for options that are not wired up.
    pub fn noop() -> Self {
        Self::from(|_| ())
    }
}

impl<IN> Default for Callback<IN> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<IN: 'static, OUT: 'static> Callback<IN, OUT> {
    /// Adapt a callback to accept a different input type by mapping through
    /// `func` first.
    pub fn reform<F, T>(&self, func: F) -> Callback<T, OUT>
    where
        F: Fn(T) -> IN + 'static,
    {
        let this = self.clone();
        Callback::from(move |input| this.emit(func(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn emits_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let cb = Callback::from(move |v: u32| sink.borrow_mut().push(v));
        cb.emit(1);
        cb.emit(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn reform_maps_input() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let cb = Callback::from(move |v: String| sink.borrow_mut().push(v));
        let reformed = cb.reform(|n: u32| format!("peer-{n}"));
        reformed.emit(7);
        assert_eq!(*seen.borrow(), vec!["peer-7".to_string()]);
    }

    #[test]
    fn noop_does_nothing() {
        let cb: Callback<&str> = Callback::noop();
        cb.emit("ignored");
    }
}

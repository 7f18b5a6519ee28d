//! Record type a session is bound to

use crate::error::{Error, Result};
use crate::schema::Record;
use std::any::{type_name, Any, TypeId};

/// The plan resolved for the first record type a session saw
pub(crate) struct Binding {
    record: TypeId,
    type_name: &'static str,
    plan: Box<dyn Any + Send>,
}

impl Binding {
    pub(crate) fn new<R: Record, P: Any + Send>(plan: P) -> Self {
        Self {
            record: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            plan: Box::new(plan),
        }
    }

    pub(crate) fn check<R: Record>(&self) -> Result<()> {
        if self.record == TypeId::of::<R>() {
            Ok(())
        } else {
            Err(Error::invalid_target(
                type_name::<R>(),
                format!("session is bound to '{}'", self.type_name),
            ))
        }
    }

    pub(crate) fn plan<R: Record, P: Any>(&self) -> Result<&P> {
        self.check::<R>()?;
        self.plan.downcast_ref::<P>().ok_or_else(|| {
            Error::invalid_target(type_name::<R>(), "session plan has an unexpected type")
        })
    }
}

/// Plan of a bound session, or an error if the session is unbound
pub(crate) fn bound_plan<R: Record, P: Any>(binding: Option<&Binding>) -> Result<&P> {
    binding
        .ok_or_else(|| Error::invalid_target(type_name::<R>(), "session is not bound"))?
        .plan::<R, P>()
}

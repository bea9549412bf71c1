use crate::error::Result;
use crate::session::{ConnState, EventBody};

use super::{Analyzer, Delivery};

/// An external signature matching engine.
pub trait SignatureEngine {
    /// Prepare matching for a new connection.
    ///
    /// An error rejects the connection.
    fn init_state(&self, conn: &ConnState) -> Result<Box<dyn MatchState>>;
}

/// The matching state of one connection.
pub trait MatchState {
    /// Match the next data of one direction, returning the names of all rules that matched.
    fn feed(&mut self, is_orig: bool, data: &[u8]) -> Vec<String>;
}

/// The analyzer handing connection data to the signature engine.
pub struct SignatureNode {
    state: Box<dyn MatchState>,
}

impl SignatureNode {
    pub fn new(state: Box<dyn MatchState>) -> Self {
        SignatureNode { state }
    }
}

impl Analyzer for SignatureNode {
    fn name(&self) -> &'static str {
        "SIGNATURE"
    }

    fn deliver_packet(&mut self, conn: &mut ConnState, delivery: &mut Delivery) {
        for rule in self.state.feed(delivery.is_orig, delivery.data) {
            conn.enqueue(EventBody::SignatureMatch { rule, is_orig: delivery.is_orig });
        }
    }
}

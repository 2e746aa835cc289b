use std::sync::Arc;

use corerpc_endpoint::{BoxEndpoint, Error};
use corerpc_sd::Endpointer;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::balancer::{Balancer, ErrNoEndpoints};

/// Picks uniformly at random among an [`Endpointer`]'s current
/// endpoints. Seeded explicitly (rather than from entropy) so repeated
/// runs of a test or a simulation are reproducible.
pub struct RandomBalancer<Req, Resp> {
    endpointer: Arc<dyn Endpointer<Req, Resp>>,
    rng: Mutex<StdRng>,
}

impl<Req, Resp> RandomBalancer<Req, Resp> {
    pub fn new(endpointer: Arc<dyn Endpointer<Req, Resp>>, seed: u64) -> Self {
        RandomBalancer {
            endpointer,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<Req, Resp> Balancer<Req, Resp> for RandomBalancer<Req, Resp>
where
    Req: Send + Sync,
    Resp: Send + Sync,
{
    fn endpoint(&self) -> Result<BoxEndpoint<Req, Resp>, Error> {
        let endpoints = self.endpointer.endpoints()?;
        if endpoints.is_empty() {
            return Err(Box::new(ErrNoEndpoints));
        }
        let index = self.rng.lock().gen_range(0..endpoints.len());
        Ok(endpoints[index].clone())
    }
}

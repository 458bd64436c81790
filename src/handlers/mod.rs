// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth) → Elevated (admin role)
//
// Routes are wired in `app::router`; handlers only shape requests and
// responses around the store.

pub mod extract;
pub mod validate;

pub mod elevated; // Tier 3: administrator role required
pub mod protected; // Tier 2: JWT authentication required
pub mod public; // Tier 1: no authentication required

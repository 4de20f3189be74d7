/// A provisional placement returned by [`super::ClusterStore::reserve_best_fit`].
/// Holds capacity and a host port that nothing else can claim until this
/// reservation is committed or released.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub node_id: String,
    pub host_port: u16,
    pub cpu_required: u32,
}

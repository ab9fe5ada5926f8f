use model::{core::identifiers::InstanceId, execution::params::JobParameters};

/// Stable identity of a job instance: the same name and parameters always
/// map to the same instance, which is what makes a re-run resume.
pub fn make_instance_id(job_name: &str, params: &JobParameters) -> InstanceId {
    let mut h = blake3::Hasher::new();
    field(&mut h, job_name);
    for (key, value) in params.iter() {
        field(&mut h, key);
        field(&mut h, value);
    }
    InstanceId::new(format!("{job_name}-{}", &h.finalize().to_hex()[..16]))
}

// Length-prefixed so that separators inside names or values cannot shift
// bytes from one field into the next.
fn field(h: &mut blake3::Hasher, value: &str) {
    h.update(&(value.len() as u64).to_le_bytes());
    h.update(value.as_bytes());
}

pub const DEVICE_IDS: [&str; 3] = [
    "bf7ecfc010164c849dwpqp",
    "bf58e5674b50680432umav",
    "bfefd09a22241b31b10cpo",
];

pub fn device_status_path(device_id: &str) -> String {
    format!("/v1.0/devices/{device_id}/status")
}

pub mod attendance_service;
pub mod check_in_service;
pub mod event_service;
pub mod token_service;

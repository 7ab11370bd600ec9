pub mod common;

pub mod a001_lead;
pub mod a002_customer;
pub mod a003_inventory_item;
pub mod a004_sale;
pub mod a005_payment;
pub mod a006_referral;
pub mod a007_service_ticket;
pub mod a008_attendance;

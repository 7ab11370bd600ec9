use serde::{Deserialize, Serialize};

crate::string_enum! {
    /// Staff role; decides which permissions a user holds
    pub enum Role {
        Admin => "ADMIN",
        Manager => "MANAGER",
        Sales => "SALES",
        Technician => "TECHNICIAN",
        Accounts => "ACCOUNTS",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    UsersManage,
    LeadsRead,
    LeadsWrite,
    CustomersRead,
    CustomersWrite,
    InventoryRead,
    InventoryWrite,
    SalesRead,
    SalesCreate,
    PaymentsRead,
    PaymentsWrite,
    ReferralsRead,
    ReferralsWrite,
    ServiceRead,
    ServiceWrite,
    ServiceClose,
    AttendanceSelf,
    AttendanceManage,
    DashboardRead,
}

impl Role {
    pub fn allows(self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::Manager => permission != UsersManage,
            Role::Sales => matches!(
                permission,
                LeadsRead
                    | LeadsWrite
                    | CustomersRead
                    | CustomersWrite
                    | InventoryRead
                    | SalesRead
                    | SalesCreate
                    | PaymentsRead
                    | ReferralsRead
                    | ReferralsWrite
                    | AttendanceSelf
                    | DashboardRead
            ),
            Role::Technician => matches!(
                permission,
                ServiceRead | ServiceWrite | InventoryRead | CustomersRead | AttendanceSelf
            ),
            Role::Accounts => matches!(
                permission,
                PaymentsRead
                    | PaymentsWrite
                    | SalesRead
                    | CustomersRead
                    | ServiceRead
                    | ServiceClose
                    | ReferralsRead
                    | ReferralsWrite
                    | AttendanceSelf
                    | DashboardRead
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_everything() {
        assert!(Role::Admin.allows(Permission::UsersManage));
        assert!(Role::Admin.allows(Permission::ServiceClose));
    }

    #[test]
    fn manager_cannot_manage_users() {
        assert!(!Role::Manager.allows(Permission::UsersManage));
        assert!(Role::Manager.allows(Permission::AttendanceManage));
        assert!(Role::Manager.allows(Permission::InventoryWrite));
    }

    #[test]
    fn sales_cannot_touch_stock_or_service() {
        assert!(Role::Sales.allows(Permission::SalesCreate));
        assert!(!Role::Sales.allows(Permission::InventoryWrite));
        assert!(!Role::Sales.allows(Permission::ServiceWrite));
        assert!(!Role::Sales.allows(Permission::PaymentsWrite));
    }

    #[test]
    fn technician_is_limited_to_service() {
        assert!(Role::Technician.allows(Permission::ServiceWrite));
        assert!(!Role::Technician.allows(Permission::ServiceClose));
        assert!(!Role::Technician.allows(Permission::LeadsRead));
        assert!(!Role::Technician.allows(Permission::DashboardRead));
    }

    #[test]
    fn accounts_closes_tickets_and_takes_payments() {
        assert!(Role::Accounts.allows(Permission::ServiceClose));
        assert!(Role::Accounts.allows(Permission::PaymentsWrite));
        assert!(!Role::Accounts.allows(Permission::SalesCreate));
    }
}

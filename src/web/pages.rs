/// `k=<page>`로 고를 수 있는 페이지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Blocks,
    PoolBlocks,
    Payout,
    Workers,
    Payments,
    Settings,
    UserSet,
    WorkMgt,
    AddrMgt,
    TwoFa,
    Reset,
    Reg,
    Shifts,
    UsPerf,
    PsPerf,
    Luck,
    Stats,
    Ckp,
    Pplns,
    Pplns2,
    Percent,
    MPayouts,
    UserInfo,
    Events,
    Ips,
    AllWork,
    Api,
}

impl Page {
    const ALL: &'static [Page] = &[
        Page::Index,
        Page::Blocks,
        Page::PoolBlocks,
        Page::Payout,
        Page::Workers,
        Page::Payments,
        Page::Settings,
        Page::UserSet,
        Page::WorkMgt,
        Page::AddrMgt,
        Page::TwoFa,
        Page::Reset,
        Page::Reg,
        Page::Shifts,
        Page::UsPerf,
        Page::PsPerf,
        Page::Luck,
        Page::Stats,
        Page::Ckp,
        Page::Pplns,
        Page::Pplns2,
        Page::Percent,
        Page::MPayouts,
        Page::UserInfo,
        Page::Events,
        Page::Ips,
        Page::AllWork,
        Page::Api,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Page::Index => "index",
            Page::Blocks => "blocks",
            Page::PoolBlocks => "pblocks",
            Page::Payout => "payout",
            Page::Workers => "workers",
            Page::Payments => "payments",
            Page::Settings => "settings",
            Page::UserSet => "userset",
            Page::WorkMgt => "workmgt",
            Page::AddrMgt => "addrmgt",
            Page::TwoFa => "2fa",
            Page::Reset => "reset",
            Page::Reg => "reg",
            Page::Shifts => "shifts",
            Page::UsPerf => "usperf",
            Page::PsPerf => "psperf",
            Page::Luck => "luck",
            Page::Stats => "stats",
            Page::Ckp => "ckp",
            Page::Pplns => "pplns",
            Page::Pplns2 => "pplns2",
            Page::Percent => "percent",
            Page::MPayouts => "mpayouts",
            Page::UserInfo => "userinfo",
            Page::Events => "events",
            Page::Ips => "ips",
            Page::AllWork => "allwork",
            Page::Api => "api",
        }
    }

    /// 메뉴에 없는 이름(빈 이름 포함)은 홈(index)
    pub fn from_name(name: &str) -> Page {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .unwrap_or(Page::Index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for page in Page::ALL {
            assert_eq!(Page::from_name(page.name()), *page);
        }
    }

    #[test]
    fn test_unknown_name_falls_back_to_index() {
        assert_eq!(Page::from_name(""), Page::Index);
        assert_eq!(Page::from_name("API"), Page::Index);
        assert_eq!(Page::from_name("nosuch"), Page::Index);
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ckweb")]
#[command(version)]
#[command(about = "Mining pool web front end for ckdb", long_about = None)]
pub struct Cli {
    /// 설정 파일 경로 (기본: ~/.ckweb/config.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// 디버그 로그 출력
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// HTTP 서버 실행
    Serve {
        /// 설정 파일의 listen 주소 대신 사용
        #[arg(short = 'l', long)]
        listen: Option<String>,
    },

    /// 표준 입력의 각 줄을 ckdb로 보내고 응답을 출력
    Msg {
        /// 'TAB' 문자열을 탭 문자로 바꾸지 않음
        #[arg(short = 't', long)]
        no_tabs: bool,
    },

    /// ckdb 명령 하나를 인코딩해서 보내고 필드를 출력
    Query {
        /// ckdb 명령 (예: homepage, workers)
        cmd: String,

        /// name=value 형식의 필드
        fields: Vec<String>,

        /// createby로 보낼 사용자
        #[arg(short = 'u', long)]
        user: Option<String>,

        /// 응답 데이터를 해석하지 않고 그대로 출력
        #[arg(long)]
        raw: bool,
    },

    /// ckdb 연결 확인 (ping + version)
    Ping,

    /// 사용자 비밀번호 확인
    Chkpass {
        username: String,
    },

    /// 기본 설정 파일 생성
    InitConfig,
}
